use crate::domain::models::DaySnapshot;

/// Share of work blocks marked done, rounded half up. Breaks never count.
pub fn progress_percent(snapshot: &DaySnapshot) -> u8 {
    let (work, done) = snapshot
        .blocks()
        .iter()
        .filter(|block| !block.is_break)
        .fold((0u64, 0u64), |(work, done), block| {
            (work + 1, done + u64::from(block.done))
        });
    if work == 0 {
        return 0;
    }
    ((200 * done + work) / (2 * work)) as u8
}
