//! Server state shared by every handler.

use std::sync::Arc;

use serde::Deserialize;

use crate::{
    config::ServerConfig,
    domain::{ConnectionRegistry, QuizRecordStore, RoomRepository},
    infrastructure::{
        Broadcaster,
        repository::{InMemoryConnectionRegistry, InMemoryQuizRecordStore, InMemoryRoomRepository},
    },
    usecase::{
        BuzzUseCase, CreateRoomUseCase, HostControlUseCase, JoinRoomUseCase, LeaveRoomUseCase,
        SessionUseCase, SubmitAnswerUseCase,
    },
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub client_id: String,
}

/// Query parameters for the quiz event stream
#[derive(Debug, Deserialize)]
pub struct EventStreamQuery {
    pub client_id: String,
    pub display_name: String,
}

/// Shared application state
pub struct AppState {
    /// Room Store
    pub rooms: Arc<dyn RoomRepository>,
    /// Quiz questions, answers and scores
    pub quiz: Arc<dyn QuizRecordStore>,
    /// Fan-out over the connection registry
    pub broadcaster: Broadcaster,
    pub config: ServerConfig,
}

impl AppState {
    /// Build the state with in-memory stores.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_stores(
            Arc::new(InMemoryRoomRepository::new()),
            Arc::new(InMemoryConnectionRegistry::new()),
            Arc::new(InMemoryQuizRecordStore::new()),
            config,
        )
    }

    pub fn with_stores(
        rooms: Arc<dyn RoomRepository>,
        connections: Arc<dyn ConnectionRegistry>,
        quiz: Arc<dyn QuizRecordStore>,
        config: ServerConfig,
    ) -> Self {
        Self {
            rooms,
            quiz,
            broadcaster: Broadcaster::new(connections),
            config,
        }
    }

    pub fn connections(&self) -> &Arc<dyn ConnectionRegistry> {
        self.broadcaster.registry()
    }

    pub fn create_room(&self) -> CreateRoomUseCase {
        CreateRoomUseCase::new(self.rooms.clone(), self.quiz.clone())
    }

    pub fn join_room(&self) -> JoinRoomUseCase {
        JoinRoomUseCase::new(self.rooms.clone(), self.quiz.clone(), self.broadcaster.clone())
    }

    pub fn leave_room(&self) -> LeaveRoomUseCase {
        LeaveRoomUseCase::new(self.rooms.clone(), self.broadcaster.clone())
    }

    pub fn host_control(&self) -> HostControlUseCase {
        let usecase = HostControlUseCase::new(
            self.rooms.clone(),
            self.quiz.clone(),
            self.broadcaster.clone(),
        );
        match self.config.question_deadline_grace {
            Some(grace) => usecase.with_question_deadline(grace),
            None => usecase,
        }
    }

    pub fn submit_answer(&self) -> SubmitAnswerUseCase {
        SubmitAnswerUseCase::new(self.rooms.clone(), self.quiz.clone(), self.broadcaster.clone())
    }

    pub fn session(&self) -> SessionUseCase {
        SessionUseCase::new(
            self.rooms.clone(),
            self.join_room(),
            self.leave_room(),
            BuzzUseCase::new(self.rooms.clone(), self.broadcaster.clone()),
            self.host_control(),
            self.broadcaster.clone(),
        )
    }
}
