use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

pub const SUB_ITEM_SLOTS: usize = 3;
pub const NEW_BLOCK_TITLE: &str = "New Task";
pub const NEW_BLOCK_DURATION_MINUTES: u32 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(deserialize_with = "deserialize_block_id")]
    pub id: String,
    pub title: String,
    #[serde(alias = "durationMin", default = "default_duration_minutes")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub is_break: bool,
    #[serde(default)]
    pub done: bool,
    #[serde(default, alias = "subtasks", skip_serializing_if = "Option::is_none")]
    pub sub_items: Option<Vec<String>>,
}

impl Block {
    pub fn work(id: &str, title: &str, duration_minutes: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            duration_minutes,
            is_break: false,
            done: false,
            sub_items: None,
        }
    }

    pub fn rest(id: &str, title: &str, duration_minutes: u32) -> Self {
        Self {
            is_break: true,
            ..Self::work(id, title, duration_minutes)
        }
    }

    pub fn with_sub_items(mut self, items: &[&str]) -> Self {
        self.sub_items = Some(items.iter().map(|item| item.to_string()).collect());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "block.id")?;
        if self.duration_minutes == 0 {
            return Err(format!("block {} duration_minutes must be > 0", self.id));
        }
        Ok(())
    }
}

/// Parameters for a block created by the add action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDraft {
    pub title: String,
    pub duration_minutes: u32,
}

impl Default for BlockDraft {
    fn default() -> Self {
        Self {
            title: NEW_BLOCK_TITLE.to_string(),
            duration_minutes: NEW_BLOCK_DURATION_MINUTES,
        }
    }
}

impl BlockDraft {
    pub fn validate(&self) -> Result<(), String> {
        if self.duration_minutes == 0 {
            return Err("draft.duration_minutes must be > 0".to_string());
        }
        Ok(())
    }
}

/// The ordered block list of one calendar day. Position is schedule order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DaySnapshot {
    blocks: Vec<Block>,
}

impl DaySnapshot {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for block in &self.blocks {
            block.validate()?;
            if !seen.insert(block.id.as_str()) {
                return Err(format!("duplicate block id {}", block.id));
            }
        }
        Ok(())
    }
}

impl From<Vec<Block>> for DaySnapshot {
    fn from(blocks: Vec<Block>) -> Self {
        Self::new(blocks)
    }
}

/// Default list used for any day that has never been edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleTemplate {
    blocks: Vec<Block>,
}

impl ScheduleTemplate {
    pub fn builtin() -> Self {
        Self {
            blocks: vec![
                Block::work("t1", "Internship hunt", 90),
                Block::rest("b1", "Break #1", 20),
                Block::work("t2", "Apply for jobs", 90),
                Block::rest("b2", "Break #2", 20),
                Block::work("t3", "B.Tech Subjects", 90).with_sub_items(&[
                    "Subject 1",
                    "Subject 2",
                    "Subject 3",
                ]),
                Block::rest("l", "Lunch + recharge", 50),
                Block::work("t4", "DSA + NxtWave revision", 90),
                Block::rest("b3", "Break #3", 20),
                Block::work("t5", "Embedded Systems", 90),
                Block::rest("b4", "Break #4", 20),
                Block::work("t3c", "B.Tech Practice", 90),
            ],
        }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, String> {
        if blocks.is_empty() {
            return Err("template must contain at least one block".to_string());
        }
        DaySnapshot::new(blocks.clone()).validate()?;
        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Fresh, independently owned snapshot with every block undone.
    pub fn clone_template(&self) -> DaySnapshot {
        DaySnapshot::new(
            self.blocks
                .iter()
                .map(|block| Block {
                    done: false,
                    ..block.clone()
                })
                .collect(),
        )
    }
}

impl Default for ScheduleTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

fn default_duration_minutes() -> u32 {
    NEW_BLOCK_DURATION_MINUTES
}

fn deserialize_block_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Integer(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(value) => value,
        RawId::Integer(value) => value.to_string(),
    })
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
