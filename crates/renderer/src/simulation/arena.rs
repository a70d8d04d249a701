use std::fmt;
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Position,
    Velocity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// One of the four simulation surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    pub channel: Channel,
    pub side: Side,
}

impl SlotId {
    pub const ALL: [SlotId; 4] = [
        SlotId::new(Channel::Position, Side::A),
        SlotId::new(Channel::Position, Side::B),
        SlotId::new(Channel::Velocity, Side::A),
        SlotId::new(Channel::Velocity, Side::B),
    ];

    pub const fn new(channel: Channel, side: Side) -> Self {
        Self { channel, side }
    }

    pub fn index(self) -> usize {
        let channel = match self.channel {
            Channel::Position => 0,
            Channel::Velocity => 2,
        };
        let side = match self.side {
            Side::A => 0,
            Side::B => 1,
        };
        channel + side
    }

    pub fn label(self) -> &'static str {
        match (self.channel, self.side) {
            (Channel::Position, Side::A) => "positionA",
            (Channel::Position, Side::B) => "positionB",
            (Channel::Velocity, Side::A) => "velocityA",
            (Channel::Velocity, Side::B) => "velocityB",
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One-bit selector of the readable side. Starts with side A readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipFlop {
    generation: bool,
}

impl FlipFlop {
    pub fn new() -> Self {
        Self { generation: true }
    }

    pub fn generation(self) -> bool {
        self.generation
    }

    pub fn readable(self) -> Side {
        if self.generation {
            Side::A
        } else {
            Side::B
        }
    }

    pub fn plan(self) -> FramePlan {
        FramePlan {
            read: self.readable(),
        }
    }

    pub fn flip(&mut self) {
        self.generation = !self.generation;
    }
}

impl Default for FlipFlop {
    fn default() -> Self {
        Self::new()
    }
}

/// Read/write sides for one frame; writes always target the opposite side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    read: Side,
}

impl FramePlan {
    pub fn read(self, channel: Channel) -> SlotId {
        SlotId::new(channel, self.read)
    }

    pub fn write(self, channel: Channel) -> SlotId {
        SlotId::new(channel, self.read.other())
    }
}

/// Fixed storage for one value per slot.
#[derive(Debug)]
pub struct SurfaceArena<T> {
    slots: [T; 4],
}

impl<T> SurfaceArena<T> {
    pub fn try_new<E>(mut make: impl FnMut(SlotId) -> Result<T, E>) -> Result<Self, E> {
        let [a, b, c, d] = SlotId::ALL;
        Ok(Self {
            slots: [make(a)?, make(b)?, make(c)?, make(d)?],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        SlotId::ALL.into_iter().zip(self.slots.iter())
    }
}

impl<T> Index<SlotId> for SurfaceArena<T> {
    type Output = T;

    fn index(&self, slot: SlotId) -> &T {
        &self.slots[slot.index()]
    }
}

impl<T> IndexMut<SlotId> for SurfaceArena<T> {
    fn index_mut(&mut self, slot: SlotId) -> &mut T {
        &mut self.slots[slot.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_reads_one_side_and_writes_the_other() {
        let mut flip = FlipFlop::new();
        let plan = flip.plan();
        assert_eq!(plan.read(Channel::Position), SlotId::new(Channel::Position, Side::A));
        assert_eq!(plan.write(Channel::Velocity), SlotId::new(Channel::Velocity, Side::B));

        flip.flip();
        assert!(!flip.generation());
        let plan = flip.plan();
        assert_eq!(plan.read(Channel::Velocity), SlotId::new(Channel::Velocity, Side::B));
        assert_eq!(plan.write(Channel::Position), SlotId::new(Channel::Position, Side::A));
    }

    #[test]
    fn slot_indices_are_distinct() {
        let mut seen: Vec<_> = SlotId::ALL.iter().map(|slot| slot.index()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn arena_indexes_by_slot() {
        let mut arena =
            SurfaceArena::try_new(|slot| Ok::<_, ()>(slot.label().to_string())).unwrap();
        let slot = SlotId::new(Channel::Velocity, Side::A);
        assert_eq!(arena[slot], "velocityA");
        arena[slot].push('!');
        assert_eq!(arena.iter().filter(|(_, v)| v.ends_with('!')).count(), 1);
    }
}
