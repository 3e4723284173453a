/// A randomly selected (core value, quote) pair eligible for appending to
/// the queue: the quote is guaranteed absent from the queue at pick time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplenishmentPick {
    pub core_value_id: String,
    pub quote_id: String,
}
