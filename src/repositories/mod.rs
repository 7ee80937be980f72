pub(crate) mod attempts;
pub(crate) mod batches;
pub(crate) mod leaderboard;
pub(crate) mod postgres;
pub(crate) mod question_sets;
pub(crate) mod questions;
pub(crate) mod store;
pub(crate) mod submissions;
pub(crate) mod test_definitions;
pub(crate) mod test_sets;

pub(crate) use postgres::PgStore;
pub(crate) use questions::QuestionFilter;
pub(crate) use store::{ExamStore, StoreError};
