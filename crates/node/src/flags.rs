use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// State flags carried by every scene object.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ObjectFlags: u32 {
        const SELECTED    = 1 << 0;
        /// Hidden by the user
        const HIDDEN      = 1 << 1;
        const FROZEN      = 1 << 2;
        /// Mouse-over highlight
        const HIGHLIGHT   = 1 << 3;
        /// Logically deleted, waiting for the arena entry to go away
        const DELETED     = 1 << 4;
        /// Shared between several levels or layers
        const SHARED      = 1 << 5;
        const NO_HIT_TEST = 1 << 6;
        /// Hidden by visibility rules rather than by the user
        const INVISIBLE   = 1 << 7;
        /// Transient object, never written to a document
        const DONT_SAVE   = 1 << 8;
        /// Drawn without depth testing
        const SHOW_ICONONTOP = 1 << 9;
    }
}

impl ObjectFlags {
    /// Flags written to a document and restored on load.
    pub const PERSISTENT: Self = Self::HIDDEN
        .union(Self::FROZEN)
        .union(Self::NO_HIT_TEST)
        .union(Self::SHOW_ICONONTOP);

    pub fn persistent(self) -> Self {
        self & Self::PERSISTENT
    }
}

bitflags! {
    /// Describes where a transform change comes from and which parts of the
    /// pose it touched.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct UpdateFlags: u32 {
        const USER_INPUT       = 1 << 0;
        const POSITION_CHANGED = 1 << 1;
        const ROTATION_CHANGED = 1 << 2;
        const SCALE_CHANGED    = 1 << 3;
        /// Store the value but leave the world cache alone
        const DO_NOT_INVALIDATE = 1 << 4;
        const PARENT_CHANGED   = 1 << 5;
        const UNDO             = 1 << 6;
        const RESTORE_UNDO     = 1 << 7;
        const USER_INPUT_UNDO  = 1 << 8;
        /// Driven by animation playback; bypasses delegates and undo
        const ANIMATED         = 1 << 9;
        const MOVE_TOOL        = 1 << 10;
        const SCALE_TOOL       = 1 << 11;
    }
}

impl UpdateFlags {
    /// Flags passed by undo and redo replay.
    pub const REPLAY: Self = Self::UNDO.union(Self::RESTORE_UNDO);

    /// Mask of the three "which part changed" bits.
    pub const POSE_CHANGED: Self = Self::POSITION_CHANGED
        .union(Self::ROTATION_CHANGED)
        .union(Self::SCALE_CHANGED);

    /// Whether the change came from an interactive tool or direct user input.
    pub fn is_interactive(self) -> bool {
        self.intersects(Self::MOVE_TOOL | Self::SCALE_TOOL | Self::USER_INPUT)
    }
}
