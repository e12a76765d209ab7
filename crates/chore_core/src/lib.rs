pub mod board;
pub mod chore;
pub mod completion;
pub mod dates;
pub mod due;
pub mod error;
pub mod habits;
pub mod plan;
pub mod service;
pub mod session;
pub mod storage;

pub use crate::board::{ChoreBoard, DragPayload, DropOutcome, Region};
pub use crate::chore::{Category, Chore, ChoreId};
pub use crate::error::ChoreError;
pub use crate::service::{ChoreService, ChoreServiceBuilder};
