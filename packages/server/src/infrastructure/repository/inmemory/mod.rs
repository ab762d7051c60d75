//! インメモリ実装
//!
//! 単一プロセスのメモリ上に状態を持つ実装群。永続化はしません。

pub mod connection;
pub mod quiz_record;
pub mod room;

pub use connection::InMemoryConnectionRegistry;
pub use quiz_record::InMemoryQuizRecordStore;
pub use room::InMemoryRoomRepository;
