use std::collections::{BTreeMap, HashSet};

use crate::db::models::{Block, TestDefinition};

/// Name of the block that times a test declared without blocks.
pub(crate) const IMPLICIT_BLOCK: &str = "main";

/// Seconds available per timing block.
///
/// Each block is timed by its own `duration_minutes`. A test without blocks is a single
/// implicit block covering every section, timed by the test duration.
pub(crate) fn section_time_budgets(test: &TestDefinition) -> BTreeMap<String, i64> {
    if test.blocks.0.is_empty() {
        let seconds = i64::from(test.duration_minutes.max(0)) * 60;
        return BTreeMap::from([(IMPLICIT_BLOCK.to_string(), seconds)]);
    }

    test.blocks
        .0
        .iter()
        .map(|block| (block.name.clone(), i64::from(block.duration_minutes) * 60))
        .collect()
}

/// Checks that `blocks` partition the `section_count` sections.
pub(crate) fn validate_blocks(section_count: usize, blocks: &[Block]) -> Result<(), String> {
    if blocks.is_empty() {
        return Ok(());
    }

    let mut names = HashSet::new();
    let mut owner: Vec<Option<&str>> = vec![None; section_count];

    for block in blocks {
        let name = block.name.trim();
        if name.is_empty() {
            return Err("block name must not be empty".to_string());
        }
        if !names.insert(name) {
            return Err(format!("duplicate block name '{name}'"));
        }
        if block.duration_minutes == 0 {
            return Err(format!("block '{name}' must have a positive duration"));
        }
        if block.section_indices.is_empty() {
            return Err(format!("block '{name}' has no sections"));
        }

        for &index in &block.section_indices {
            let Some(slot) = owner.get_mut(index) else {
                return Err(format!("block '{name}' references unknown section {index}"));
            };
            if let Some(previous) = slot.replace(name) {
                return Err(format!("section {index} is in both '{previous}' and '{name}'"));
            }
        }
    }

    if let Some(index) = owner.iter().position(Option::is_none) {
        return Err(format!("section {index} is not assigned to any block"));
    }

    Ok(())
}
