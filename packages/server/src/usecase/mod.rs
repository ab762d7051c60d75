//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層を操作します。

pub mod buzz;
pub mod create_room;
pub mod error;
pub mod host_control;
pub mod join_room;
pub mod leave_room;
pub mod session;
pub mod submit_answer;

pub use buzz::BuzzUseCase;
pub use create_room::{CreateRoomUseCase, RoomBlueprint};
pub use error::{ErrorKind, UseCaseError};
pub use host_control::{AdvanceResult, HostControlUseCase};
pub use join_room::{JoinRequest, JoinRoomUseCase, Joined};
pub use leave_room::LeaveRoomUseCase;
pub use session::{SessionContext, SessionUseCase};
pub use submit_answer::{AnswerResult, SubmitAnswerUseCase};
