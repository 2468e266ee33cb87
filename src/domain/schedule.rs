use crate::domain::models::{Block, BlockDraft, DaySnapshot, ScheduleTemplate, SUB_ITEM_SLOTS};

// Every edit returns a new snapshot; unknown ids leave the list unchanged.
impl DaySnapshot {
    pub fn toggle_done(&self, id: &str) -> DaySnapshot {
        self.map_block(id, |block| {
            if !block.is_break {
                block.done = !block.done;
            }
        })
    }

    pub fn rename_block(&self, id: &str, title: &str) -> DaySnapshot {
        self.map_block(id, |block| block.title = title.to_string())
    }

    /// Absent sub-items are initialized to [`SUB_ITEM_SLOTS`] empty strings
    /// first. An index outside the current slots leaves the list untouched.
    pub fn edit_sub_item(&self, id: &str, index: usize, value: &str) -> DaySnapshot {
        let Some(target) = self.find(id) else {
            return self.clone();
        };
        let slots = target.sub_items.as_ref().map_or(SUB_ITEM_SLOTS, Vec::len);
        if index >= slots {
            return self.clone();
        }

        self.map_block(id, |block| {
            let items = block
                .sub_items
                .get_or_insert_with(|| vec![String::new(); SUB_ITEM_SLOTS]);
            items[index] = value.to_string();
        })
    }

    /// Inserts a work block before the final block, or appends to an empty list.
    pub fn add_block(&self, draft: &BlockDraft, id: String) -> DaySnapshot {
        let block = Block {
            id,
            title: draft.title.clone(),
            duration_minutes: draft.duration_minutes,
            is_break: false,
            done: false,
            sub_items: None,
        };
        let mut blocks = self.blocks().to_vec();
        let position = blocks.len().saturating_sub(1);
        blocks.insert(position, block);
        DaySnapshot::new(blocks)
    }

    pub fn remove_block(&self, id: &str) -> DaySnapshot {
        DaySnapshot::new(
            self.blocks()
                .iter()
                .filter(|block| block.id != id)
                .cloned()
                .collect(),
        )
    }

    pub fn unmark_all(&self) -> DaySnapshot {
        DaySnapshot::new(
            self.blocks()
                .iter()
                .map(|block| Block {
                    done: false,
                    ..block.clone()
                })
                .collect(),
        )
    }

    pub fn reset_to_template(template: &ScheduleTemplate) -> DaySnapshot {
        template.clone_template()
    }

    fn map_block<F>(&self, id: &str, mut edit: F) -> DaySnapshot
    where
        F: FnMut(&mut Block),
    {
        DaySnapshot::new(
            self.blocks()
                .iter()
                .cloned()
                .map(|mut block| {
                    if block.id == id {
                        edit(&mut block);
                    }
                    block
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_day() -> DaySnapshot {
        ScheduleTemplate::builtin().clone_template()
    }

    #[test]
    fn toggle_done_flips_work_blocks_only() {
        let day = sample_day();
        let toggled = day.toggle_done("t1");
        assert!(toggled.find("t1").is_some_and(|block| block.done));
        assert!(!toggled.toggle_done("t1").find("t1").is_some_and(|block| block.done));

        let break_toggled = day.toggle_done("b1");
        assert_eq!(break_toggled, day);
    }

    #[test]
    fn operations_on_unknown_id_are_noops() {
        let day = sample_day();
        assert_eq!(day.toggle_done("missing"), day);
        assert_eq!(day.rename_block("missing", "x"), day);
        assert_eq!(day.edit_sub_item("missing", 0, "x"), day);
        assert_eq!(day.remove_block("missing"), day);
    }

    #[test]
    fn rename_replaces_title_without_touching_other_fields() {
        let day = sample_day().toggle_done("t2");
        let renamed = day.rename_block("t2", "Cold emails");
        let block = renamed.find("t2").expect("renamed block");
        assert_eq!(block.title, "Cold emails");
        assert!(block.done);
        assert_eq!(block.duration_minutes, 90);
    }

    #[test]
    fn edit_sub_item_initializes_missing_slots() {
        let day = sample_day();
        let edited = day.edit_sub_item("t4", 1, "Graphs");
        assert_eq!(
            edited.find("t4").and_then(|block| block.sub_items.clone()),
            Some(vec![String::new(), "Graphs".to_string(), String::new()])
        );
        assert!(day.find("t4").is_some_and(|block| block.sub_items.is_none()));
    }

    #[test]
    fn edit_sub_item_replaces_existing_slot() {
        let edited = sample_day().edit_sub_item("t3", 2, "Signals");
        assert_eq!(
            edited.find("t3").and_then(|block| block.sub_items.clone()),
            Some(vec![
                "Subject 1".to_string(),
                "Subject 2".to_string(),
                "Signals".to_string()
            ])
        );
    }

    #[test]
    fn edit_sub_item_out_of_range_is_noop() {
        let day = sample_day();
        assert_eq!(day.edit_sub_item("t3", SUB_ITEM_SLOTS, "x"), day);
        assert_eq!(day.edit_sub_item("t4", 7, "x"), day);
    }

    #[test]
    fn add_block_inserts_before_last() {
        let day = sample_day();
        let added = day.add_block(&BlockDraft::default(), "x-1".to_string());
        assert_eq!(added.len(), day.len() + 1);
        let blocks = added.blocks();
        assert_eq!(blocks[blocks.len() - 2].id, "x-1");
        assert_eq!(blocks[blocks.len() - 2].title, "New Task");
        assert_eq!(blocks[blocks.len() - 2].duration_minutes, 60);
        assert_eq!(blocks[blocks.len() - 1].id, "t3c");
    }

    #[test]
    fn add_block_appends_to_empty_list() {
        let added = DaySnapshot::default().add_block(&BlockDraft::default(), "x-1".to_string());
        assert_eq!(added.len(), 1);
        assert_eq!(added.blocks()[0].id, "x-1");
        assert!(!added.blocks()[0].is_break);
    }

    #[test]
    fn add_block_on_single_block_list_goes_first() {
        let single = DaySnapshot::new(vec![Block::work("last", "Final", 30)]);
        let added = single.add_block(&BlockDraft::default(), "x-1".to_string());
        assert_eq!(added.blocks()[0].id, "x-1");
        assert_eq!(added.blocks()[1].id, "last");
    }

    #[test]
    fn remove_block_allows_breaks() {
        let removed = sample_day().remove_block("b2");
        assert!(!removed.contains_id("b2"));
        assert_eq!(removed.len(), 10);
    }

    #[test]
    fn unmark_all_clears_every_done_flag() {
        let day = sample_day().toggle_done("t1").toggle_done("t5");
        assert!(day.unmark_all().blocks().iter().all(|block| !block.done));
    }

    #[test]
    fn reset_to_template_yields_undone_copy() {
        let template = ScheduleTemplate::builtin();
        let mut reset = DaySnapshot::reset_to_template(&template);
        assert!(reset.blocks().iter().all(|block| !block.done));
        reset = reset.rename_block("t1", "mutated");
        assert_eq!(
            DaySnapshot::reset_to_template(&template).find("t1").map(|block| block.title.clone()),
            Some("Internship hunt".to_string())
        );
        assert_ne!(reset, DaySnapshot::reset_to_template(&template));
    }

    proptest! {
        #[test]
        fn add_then_remove_restores_list(
            durations in proptest::collection::vec(1u32..240u32, 0..12),
            title in "[A-Za-z ]{0,16}",
            duration in 1u32..240u32
        ) {
            let day = DaySnapshot::new(
                durations
                    .iter()
                    .enumerate()
                    .map(|(index, minutes)| Block::work(&format!("b{index}"), "Task", *minutes))
                    .collect(),
            );
            let draft = BlockDraft { title, duration_minutes: duration };
            let restored = day.add_block(&draft, "fresh".to_string()).remove_block("fresh");
            prop_assert_eq!(restored, day);
        }
    }
}
