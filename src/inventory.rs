//! Slot-based inventory. The document serializes as-is for the storage layer.
use serde::{Deserialize, Serialize};

use crate::field::ItemKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: ItemKind,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryResult {
    Removed { quantity: u32 },
    Moved,
    Merged { quantity: u32 },
    Swapped,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
    max_stack: u32,
}

impl Inventory {
    pub fn new(slot_count: usize, max_stack: u32) -> Self {
        Self {
            slots: vec![None; slot_count],
            max_stack: max_stack.max(1),
        }
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }

    pub fn max_stack(&self) -> u32 {
        self.max_stack
    }

    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    pub fn count(&self, kind: ItemKind) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.kind == kind)
            .map(|s| s.quantity)
            .sum()
    }

    /// Top up existing stacks of `kind` first, then fill empty slots in order.
    /// Returns how many did not fit.
    pub fn add(&mut self, kind: ItemKind, quantity: u32) -> u32 {
        let max = self.max_stack;
        let mut remaining = quantity;

        for stack in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if stack.kind == kind && stack.quantity < max {
                let moved = remaining.min(max - stack.quantity);
                stack.quantity += moved;
                remaining -= moved;
            }
        }

        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let placed = remaining.min(max);
                *slot = Some(ItemStack {
                    kind,
                    quantity: placed,
                });
                remaining -= placed;
            }
        }

        remaining
    }

    /// Take up to `quantity` from one slot; the slot empties when it reaches zero.
    pub fn remove_from_slot(&mut self, index: usize, quantity: u32) -> InventoryResult {
        if quantity == 0 {
            return InventoryResult::Failed {
                reason: "Cannot remove zero items".to_string(),
            };
        }
        let Some(slot) = self.slots.get_mut(index) else {
            return InventoryResult::Failed {
                reason: format!("No slot {}", index),
            };
        };
        let held = match slot {
            Some(stack) => stack.quantity,
            None => {
                return InventoryResult::Failed {
                    reason: "Slot is empty".to_string(),
                }
            }
        };
        if quantity >= held {
            *slot = None;
            return InventoryResult::Removed { quantity: held };
        }
        if let Some(stack) = slot.as_mut() {
            stack.quantity -= quantity;
        }
        InventoryResult::Removed { quantity }
    }

    /// Move `from` onto `to`: into an empty slot, merged into a matching stack
    /// (up to the stack limit), or swapped with a different kind.
    pub fn move_slot(&mut self, from: usize, to: usize) -> InventoryResult {
        if from >= self.slots.len() || to >= self.slots.len() {
            return InventoryResult::Failed {
                reason: "Slot out of range".to_string(),
            };
        }
        if from == to {
            return InventoryResult::Failed {
                reason: "Source and destination are the same slot".to_string(),
            };
        }
        let max = self.max_stack;
        match (self.slots[from], self.slots[to]) {
            (None, _) => InventoryResult::Failed {
                reason: "Slot is empty".to_string(),
            },
            (Some(source), None) => {
                self.slots[to] = Some(source);
                self.slots[from] = None;
                InventoryResult::Moved
            }
            (Some(source), Some(dest)) if source.kind == dest.kind && dest.quantity < max => {
                let moved = source.quantity.min(max - dest.quantity);
                self.slots[to] = Some(ItemStack {
                    kind: dest.kind,
                    quantity: dest.quantity + moved,
                });
                self.slots[from] = if moved == source.quantity {
                    None
                } else {
                    Some(ItemStack {
                        kind: source.kind,
                        quantity: source.quantity - moved,
                    })
                };
                InventoryResult::Merged { quantity: moved }
            }
            (Some(_), Some(_)) => {
                self.slots.swap(from, to);
                InventoryResult::Swapped
            }
        }
    }

    /// One line per occupied slot, e.g. `3: herb x12`.
    pub fn format_compact(&self) -> String {
        let lines: Vec<String> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|stack| format!("{}: {} x{}", i, stack.kind.key(), stack.quantity)))
            .collect();
        if lines.is_empty() {
            "(empty)".to_string()
        } else {
            lines.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_tops_up_then_fills_empty_slots() {
        let mut inv = Inventory::new(3, 10);
        assert_eq!(inv.add(ItemKind::Herb, 7), 0);
        assert_eq!(inv.add(ItemKind::Herb, 7), 0);
        assert_eq!(inv.slot(0).unwrap().quantity, 10);
        assert_eq!(inv.slot(1).unwrap().quantity, 4);
        assert_eq!(inv.add(ItemKind::Ore, 25), 9);
        assert_eq!(inv.count(ItemKind::Herb), 14);
        assert_eq!(inv.count(ItemKind::Ore), 6);
        assert_eq!(inv.free_slots(), 0);
    }

    #[test]
    fn remove_clears_empty_slot() {
        let mut inv = Inventory::new(2, 10);
        inv.add(ItemKind::Shell, 3);
        assert_eq!(inv.remove_from_slot(0, 1), InventoryResult::Removed { quantity: 1 });
        assert_eq!(inv.remove_from_slot(0, 5), InventoryResult::Removed { quantity: 2 });
        assert!(inv.slot(0).is_none());
        assert!(matches!(inv.remove_from_slot(0, 1), InventoryResult::Failed { .. }));
        assert!(matches!(inv.remove_from_slot(9, 1), InventoryResult::Failed { .. }));
        assert!(matches!(inv.remove_from_slot(1, 0), InventoryResult::Failed { .. }));
    }

    #[test]
    fn move_merges_swaps_and_moves() {
        let mut inv = Inventory::new(4, 10);
        inv.add(ItemKind::Herb, 8);
        inv.add(ItemKind::Ore, 2);
        assert_eq!(inv.move_slot(1, 3), InventoryResult::Moved);
        assert_eq!(inv.move_slot(0, 3), InventoryResult::Swapped);
        assert_eq!(inv.slot(0).unwrap().kind, ItemKind::Ore);

        let mut herbs = Inventory::new(2, 10);
        assert_eq!(herbs.add(ItemKind::Herb, 15), 0);
        // a full destination stack swaps instead of merging
        assert_eq!(herbs.move_slot(1, 0), InventoryResult::Swapped);
        assert_eq!(herbs.slot(0).unwrap().quantity, 5);
        assert_eq!(herbs.move_slot(0, 0), InventoryResult::Failed {
            reason: "Source and destination are the same slot".to_string()
        });
    }

    #[test]
    fn merge_respects_stack_limit() {
        let mut inv = Inventory::new(3, 10);
        inv.add(ItemKind::Crystal, 10);
        inv.add(ItemKind::Crystal, 6);
        inv.remove_from_slot(0, 3);
        assert_eq!(inv.move_slot(1, 0), InventoryResult::Merged { quantity: 3 });
        assert_eq!(inv.slot(0).unwrap().quantity, 10);
        assert_eq!(inv.slot(1).unwrap().quantity, 3);
    }

    #[test]
    fn document_serializes() {
        let mut inv = Inventory::new(2, 5);
        inv.add(ItemKind::Ore, 1);
        let json = serde_json::to_string(&inv).unwrap();
        let back: Inventory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inv);
        assert_eq!(inv.format_compact(), "0: ore x1");
    }
}
