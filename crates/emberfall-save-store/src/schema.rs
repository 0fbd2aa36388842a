//! Save slot database schema.

/// SQL to create the save slot table.
pub const CREATE_SAVE_SLOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS save_slots (
    slot_key   TEXT PRIMARY KEY,
    record     JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";
