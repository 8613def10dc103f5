//! Fixed-capacity store of reusable target ships.

use alloc::vec::Vec;

use crate::common::PoolError;
use crate::config::SimConfig;
use crate::domain::TargetType;
use crate::entity::Ship;

/// Reference to a pooled target. The generation detects use after release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

struct Slot {
    ship: Ship,
    generation: u32,
    in_use: bool,
}

/// Pre-allocated target ships with one free list per type.
pub struct EntityPool {
    slots: Vec<Slot>,
    free: [Vec<u32>; 2],
    capacity: [usize; 2],
}

impl EntityPool {
    pub fn new(small_capacity: usize, large_capacity: usize) -> Self {
        let capacity = [small_capacity, large_capacity];
        let mut slots = Vec::with_capacity(small_capacity + large_capacity);
        let mut free: [Vec<u32>; 2] = [Vec::new(), Vec::new()];
        for target_type in TargetType::ALL {
            let first = slots.len() as u32;
            for _ in 0..capacity[target_type.index()] {
                slots.push(Slot {
                    ship: Ship::target(target_type),
                    generation: 0,
                    in_use: false,
                });
            }
            let last = slots.len() as u32;
            // Reverse so the lowest index is handed out first.
            free[target_type.index()] = (first..last).rev().collect();
        }
        Self {
            slots,
            free,
            capacity,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.small_target_capacity, config.large_target_capacity)
    }

    /// Take a free slot of the given type, or `None` when all are in use.
    pub fn acquire(&mut self, target_type: TargetType) -> Option<Handle> {
        let index = self.free[target_type.index()].pop()?;
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.in_use = true;
        Some(Handle {
            index,
            generation: slot.generation,
        })
    }

    /// Return a slot. Nothing changes when the handle is not live.
    pub fn release(&mut self, handle: Handle) -> Result<(), PoolError> {
        let slot = self.check(handle)?;
        let target_type = slot
            .ship
            .target_state()
            .map(|t| t.target_type)
            .ok_or(PoolError::InvalidHandle)?;
        slot.in_use = false;
        slot.ship.reset();
        self.free[target_type.index()].push(handle.index);
        Ok(())
    }

    pub fn get(&self, handle: Handle) -> Result<&Ship, PoolError> {
        let slot = self
            .slots
            .get(handle.index as usize)
            .ok_or(PoolError::InvalidHandle)?;
        if slot.generation != handle.generation {
            return Err(PoolError::StaleHandle);
        }
        if !slot.in_use {
            return Err(PoolError::NotInUse);
        }
        Ok(&slot.ship)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Ship, PoolError> {
        Ok(&mut self.check(handle)?.ship)
    }

    pub fn is_live(&self, handle: Handle) -> bool {
        self.get(handle).is_ok()
    }

    pub fn capacity(&self, target_type: TargetType) -> usize {
        self.capacity[target_type.index()]
    }

    pub fn available(&self, target_type: TargetType) -> usize {
        self.free[target_type.index()].len()
    }

    pub fn in_use_count(&self) -> usize {
        self.slots.iter().filter(|s| s.in_use).count()
    }

    /// Live handles in slot order.
    pub fn handles(&self) -> Vec<Handle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.in_use)
            .map(|(i, s)| Handle {
                index: i as u32,
                generation: s.generation,
            })
            .collect()
    }

    /// Release every live slot. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let live = self.handles();
        let count = live.len();
        for handle in live {
            let _ = self.release(handle);
        }
        count
    }

    fn check(&mut self, handle: Handle) -> Result<&mut Slot, PoolError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .ok_or(PoolError::InvalidHandle)?;
        if slot.generation != handle.generation {
            return Err(PoolError::StaleHandle);
        }
        if !slot.in_use {
            return Err(PoolError::NotInUse);
        }
        Ok(slot)
    }
}
