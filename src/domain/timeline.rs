use crate::domain::models::Block;

const MINUTES_PER_DAY: u64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledBlock<'a> {
    pub block: &'a Block,
    pub start_minutes: u64,
    pub end_minutes: u64,
}

impl ScheduledBlock<'_> {
    pub fn start_label(&self) -> String {
        format_clock(self.start_minutes)
    }

    pub fn end_label(&self) -> String {
        format_clock(self.end_minutes)
    }

    pub fn export_line(&self) -> String {
        let mut line = format!("{} - {} | {}", self.start_label(), self.end_label(), self.block.title);
        if let Some(items) = &self.block.sub_items {
            line.push_str(" | ");
            line.push_str(&items.join(", "));
        }
        line
    }
}

/// Lays blocks end to end from `start_minutes`. The cursor is never wrapped,
/// so a schedule longer than a day keeps counting past midnight.
pub fn derive_times(start_minutes: u64, blocks: &[Block]) -> Vec<ScheduledBlock<'_>> {
    let mut cursor = start_minutes;
    blocks
        .iter()
        .map(|block| {
            let start = cursor;
            let end = cursor + u64::from(block.duration_minutes);
            cursor = end;
            ScheduledBlock {
                block,
                start_minutes: start,
                end_minutes: end,
            }
        })
        .collect()
}

/// `HH:MM` on a 24-hour clock.
pub fn format_clock(minutes: u64) -> String {
    let within_day = minutes % MINUTES_PER_DAY;
    format!("{:02}:{:02}", within_day / 60, within_day % 60)
}

pub fn export_text(entries: &[ScheduledBlock<'_>]) -> String {
    entries
        .iter()
        .map(ScheduledBlock::export_line)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scenario_start_eight_with_three_blocks() {
        let blocks = vec![
            Block::work("t1", "Internship hunt", 90),
            Block::rest("b1", "Break #1", 20),
            Block::work("t2", "Apply for jobs", 90),
        ];
        let labels = derive_times(8 * 60, &blocks)
            .iter()
            .map(|entry| (entry.start_label(), entry.end_label()))
            .collect::<Vec<_>>();
        assert_eq!(
            labels,
            vec![
                ("08:00".to_string(), "09:30".to_string()),
                ("09:30".to_string(), "09:50".to_string()),
                ("09:50".to_string(), "11:20".to_string()),
            ]
        );
    }

    #[test]
    fn afternoon_times_use_24_hour_clock() {
        assert_eq!(format_clock(13 * 60 + 5), "13:05");
        assert_eq!(format_clock(0), "00:00");
    }

    #[test]
    fn cursor_runs_past_midnight_but_labels_wrap() {
        let blocks = vec![Block::work("a", "Late", 120), Block::work("b", "Later", 90)];
        let entries = derive_times(23 * 60, &blocks);
        assert_eq!(entries[1].start_minutes, 25 * 60);
        assert_eq!(entries[1].end_minutes, 26 * 60 + 30);
        assert_eq!(entries[1].start_label(), "01:00");
        assert_eq!(entries[1].end_label(), "02:30");
    }

    #[test]
    fn export_text_appends_sub_items() {
        let blocks = vec![
            Block::work("t3", "B.Tech Subjects", 90).with_sub_items(&["Maths", "", "Physics"]),
            Block::rest("l", "Lunch + recharge", 50),
        ];
        let text = export_text(&derive_times(9 * 60, &blocks));
        assert_eq!(
            text,
            "09:00 - 10:30 | B.Tech Subjects | Maths, , Physics\n10:30 - 11:20 | Lunch + recharge"
        );
    }

    #[test]
    fn empty_list_derives_nothing() {
        assert!(derive_times(480, &[]).is_empty());
        assert_eq!(export_text(&[]), "");
    }

    proptest! {
        #[test]
        fn adjacent_blocks_share_boundaries(
            start in 0u64..(48 * 60),
            durations in proptest::collection::vec(0u32..600u32, 1..30)
        ) {
            let blocks = durations
                .iter()
                .enumerate()
                .map(|(index, minutes)| Block::work(&format!("b{index}"), "Task", *minutes))
                .collect::<Vec<_>>();
            let entries = derive_times(start, &blocks);

            prop_assert_eq!(entries[0].start_minutes, start);
            for pair in entries.windows(2) {
                prop_assert_eq!(pair[0].end_minutes, pair[1].start_minutes);
            }
            let total: u64 = durations.iter().map(|minutes| u64::from(*minutes)).sum();
            prop_assert_eq!(entries[entries.len() - 1].end_minutes, start + total);
        }
    }
}
