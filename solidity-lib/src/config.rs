use crate::heap::DEFAULT_MAX_ARRAY_LENGTH;

/// Knobs of one analysis session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Largest `max - min` of a range index that is still enumerated element
    /// by element. Wider ranges read as Top.
    pub max_index_span: u64,
    /// Longest array the heap holds. Accesses that would grow a dynamic
    /// array past it are out of bounds.
    pub max_array_length: u64,
    /// Fixed identity of `msg.sender`.
    pub msg_sender_id: u64,
    /// Fixed identity of `tx.origin`.
    pub tx_origin_id: u64,
    /// First identity handed out for fresh symbolic values.
    pub first_fresh_id: u64,
    /// Number of statements the straight line engine executes before giving
    /// up on a function.
    pub max_steps: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_index_span: 1024,
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            msg_sender_id: 101,
            tx_origin_id: 100,
            first_fresh_id: 1000,
            max_steps: 100_000,
        }
    }
}
