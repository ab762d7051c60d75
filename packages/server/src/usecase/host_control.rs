//! UseCase: ホスト操作
//!
//! ルームのホストだけが実行できる操作をまとめる。どの操作も最初に
//! ホストであることを確認し、拒否された場合は状態を一切変更せず、何も配信しない。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ホスト以外の呼び出しが変更・配信なしで拒否されること（モック）
//! - question_start が参加者向けとホスト向けに分けて配信されること
//! - 締め切りの自動終了（有効時のみ）
//! - ルーム削除で room_deleted が届き、接続が全て解除されること

use std::{sync::Arc, time::Duration};

use crate::{
    domain::{
        Advance, ParticipantId, QuestionStarted, QuizRecordStore, Room, RoomId, RoomKind,
        RoomRepository, RoomStatus, Timestamp, ValueObjectError, quiz::MAX_TIME_LIMIT_SECS,
    },
    infrastructure::{
        Audience, Broadcaster,
        dto::websocket::{EventPayload, QuestionView, ScoreDto, ServerEvent},
    },
};

use super::{error::UseCaseError, join_room::room_update};

/// Result of advancing a quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceResult {
    pub advanced: bool,
    pub current_question_index: usize,
}

#[derive(Clone)]
pub struct HostControlUseCase {
    rooms: Arc<dyn RoomRepository>,
    quiz: Arc<dyn QuizRecordStore>,
    broadcaster: Broadcaster,
    /// Grace period after the time limit before an open question is closed.
    /// `None` leaves closing to the host.
    deadline_grace: Option<Duration>,
}

fn question_end(room_id: &RoomId, question_index: usize) -> ServerEvent {
    ServerEvent::new(room_id, EventPayload::QuestionEnd { question_index })
}

impl HostControlUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        quiz: Arc<dyn QuizRecordStore>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            rooms,
            quiz,
            broadcaster,
            deadline_grace: None,
        }
    }

    /// Close open questions automatically `grace` after their time limit.
    pub fn with_question_deadline(mut self, grace: Duration) -> Self {
        self.deadline_grace = Some(grace);
        self
    }

    async fn load_as_host(
        &self,
        caller: &ParticipantId,
        room_id: &RoomId,
        action: &'static str,
    ) -> Result<Room, UseCaseError> {
        let room = self
            .rooms
            .get_room(room_id)
            .await
            .ok_or_else(|| UseCaseError::RoomNotFound(room_id.clone()))?;
        if !room.is_host(caller) {
            tracing::warn!(
                room_id = %room_id,
                caller = %caller,
                action,
                "Rejected host-only operation"
            );
            return Err(UseCaseError::NotHost { action });
        }
        Ok(room)
    }

    fn require_kind(room: &Room, expected: RoomKind) -> Result<(), UseCaseError> {
        if room.kind() == expected {
            Ok(())
        } else {
            Err(UseCaseError::WrongRoomKind { expected })
        }
    }

    async fn connection_count(&self, room_id: &RoomId) -> usize {
        self.broadcaster.registry().count_for_room(room_id).await
    }

    async fn broadcast_scores(&self, room_id: &RoomId) {
        let participants = self
            .quiz
            .leaderboard(room_id)
            .await
            .iter()
            .map(ScoreDto::from)
            .collect();
        let event = ServerEvent::new(room_id, EventPayload::ScoreUpdate { participants });
        self.broadcaster.broadcast(room_id, &event).await;
    }

    /// ステータスを変更する（前進のみ、同じステータスは何もしない）
    pub async fn change_status(
        &self,
        caller: &ParticipantId,
        room_id: &RoomId,
        status: RoomStatus,
    ) -> Result<Room, UseCaseError> {
        let before = self.load_as_host(caller, room_id, "change the room status").await?;
        let room = self.rooms.update_status(room_id, status).await?;
        if before.status == room.status {
            return Ok(room);
        }

        tracing::info!(
            room_id = %room_id,
            from = %before.status,
            to = %room.status,
            "Room status changed"
        );
        self.broadcaster
            .broadcast(room_id, &ServerEvent::new(room_id, EventPayload::StatusChange { status }))
            .await;
        if room.kind() == RoomKind::Quiz && status == RoomStatus::Finished {
            self.broadcast_scores(room_id).await;
        }
        Ok(room)
    }

    /// バザールームの早押しを全てクリアし、waiting に戻す
    pub async fn reset_buzzer_room(
        &self,
        caller: &ParticipantId,
        room_id: &RoomId,
    ) -> Result<Room, UseCaseError> {
        let room = self.load_as_host(caller, room_id, "reset the room").await?;
        Self::require_kind(&room, RoomKind::Buzzer)?;

        let room = self.rooms.reset_room(room_id).await?;
        tracing::info!(room_id = %room_id, "Buzzer room reset");

        self.broadcaster
            .broadcast(room_id, &ServerEvent::new(room_id, EventPayload::ResetRoom))
            .await;
        let connection_count = self.connection_count(room_id).await;
        self.broadcaster
            .broadcast(room_id, &room_update(&room, connection_count))
            .await;
        Ok(room)
    }

    /// ルームを削除し、接続中の全員に room_deleted を送ってから接続を解除する
    pub async fn delete_room(
        &self,
        caller: &ParticipantId,
        room_id: &RoomId,
    ) -> Result<Room, UseCaseError> {
        self.load_as_host(caller, room_id, "delete the room").await?;
        let room = self.rooms.delete_room(room_id).await?;
        self.quiz.remove_room(room_id).await;

        self.broadcaster
            .broadcast(room_id, &ServerEvent::new(room_id, EventPayload::RoomDeleted))
            .await;
        let closed = self.broadcaster.registry().unregister_room(room_id).await;

        tracing::info!(room_id = %room_id, closed = closed.len(), "Room deleted");
        Ok(room)
    }

    /// 問題を開始する
    ///
    /// waiting のルームは active になる。参加者には正解を除いた問題を、
    /// ホストには正解付きの問題を配信する。
    pub async fn start_question(
        &self,
        caller: &ParticipantId,
        room_id: &RoomId,
        question_index: usize,
        time_limit: Option<u32>,
    ) -> Result<QuestionStarted, UseCaseError> {
        let room = self.load_as_host(caller, room_id, "start a question").await?;
        Self::require_kind(&room, RoomKind::Quiz)?;
        let question = self.quiz.question(room_id, question_index).await?;

        let time_limit = time_limit.unwrap_or(question.time_limit_secs);
        if time_limit == 0 || time_limit > MAX_TIME_LIMIT_SECS {
            return Err(ValueObjectError::TimeLimitOutOfRange {
                max: MAX_TIME_LIMIT_SECS,
                actual: time_limit,
            }
            .into());
        }

        let started = self
            .rooms
            .start_question(room_id, question_index, time_limit)
            .await?;
        tracing::info!(
            room_id = %room_id,
            question_index,
            time_limit,
            activated = started.activated,
            "Question started"
        );

        if started.activated {
            self.broadcaster
                .broadcast(
                    room_id,
                    &ServerEvent::new(
                        room_id,
                        EventPayload::StatusChange {
                            status: RoomStatus::Active,
                        },
                    ),
                )
                .await;
        }
        for (audience, view) in [
            (
                Audience::Participants,
                QuestionView::for_participants(&question, time_limit),
            ),
            (Audience::Hosts, QuestionView::for_hosts(&question, time_limit)),
        ] {
            let event = ServerEvent::new(
                room_id,
                EventPayload::QuestionStart {
                    question_index,
                    question: view,
                    time_limit,
                },
            );
            self.broadcaster.broadcast_to(room_id, audience, &event).await;
        }

        if let Some(started_at) = started
            .room
            .quiz_progress()
            .and_then(|p| p.active_question.as_ref())
            .map(|q| q.started_at)
        {
            self.schedule_deadline(room_id.clone(), question_index, started_at, time_limit);
        }
        Ok(started)
    }

    fn schedule_deadline(
        &self,
        room_id: RoomId,
        question_index: usize,
        started_at: Timestamp,
        time_limit: u32,
    ) {
        let Some(grace) = self.deadline_grace else {
            return;
        };
        let rooms = self.rooms.clone();
        let broadcaster = self.broadcaster.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(u64::from(time_limit)) + grace).await;

            // the same question may have been closed or restarted meanwhile
            let still_open = rooms
                .get_room(&room_id)
                .await
                .and_then(|room| room.quiz_progress().and_then(|p| p.active_question.clone()))
                .is_some_and(|q| q.index == question_index && q.started_at == started_at);
            if !still_open {
                return;
            }

            match rooms.end_question(&room_id, question_index).await {
                Ok(_) => {
                    tracing::info!(
                        room_id = %room_id,
                        question_index,
                        "Question closed at deadline"
                    );
                    broadcaster
                        .broadcast(&room_id, &question_end(&room_id, question_index))
                        .await;
                }
                Err(e) => {
                    tracing::debug!(room_id = %room_id, "Deadline close skipped: {}", e);
                }
            }
        });
    }

    /// 開いている問題を締め切る
    pub async fn end_question(
        &self,
        caller: &ParticipantId,
        room_id: &RoomId,
        question_index: usize,
    ) -> Result<Room, UseCaseError> {
        let room = self.load_as_host(caller, room_id, "end a question").await?;
        Self::require_kind(&room, RoomKind::Quiz)?;

        let room = self.rooms.end_question(room_id, question_index).await?;
        tracing::info!(room_id = %room_id, question_index, "Question ended");
        self.broadcaster
            .broadcast(room_id, &question_end(room_id, question_index))
            .await;
        Ok(room)
    }

    /// 次の問題へ進む。最後の問題では進まずに `advanced = false` を返す
    pub async fn advance_to_next_question(
        &self,
        caller: &ParticipantId,
        room_id: &RoomId,
    ) -> Result<AdvanceResult, UseCaseError> {
        let room = self.load_as_host(caller, room_id, "advance the quiz").await?;
        Self::require_kind(&room, RoomKind::Quiz)?;

        match self.rooms.advance_question(room_id).await? {
            Advance::Advanced(index) => {
                if let Some(room) = self.rooms.get_room(room_id).await {
                    let connection_count = self.connection_count(room_id).await;
                    self.broadcaster
                        .broadcast(room_id, &room_update(&room, connection_count))
                        .await;
                }
                Ok(AdvanceResult {
                    advanced: true,
                    current_question_index: index,
                })
            }
            Advance::AtLastQuestion => Ok(AdvanceResult {
                advanced: false,
                current_question_index: room
                    .quiz_progress()
                    .map_or(0, |p| p.current_question_index),
            }),
        }
    }

    /// クイズを終了し、最終スコアを配信する
    pub async fn finish_quiz(
        &self,
        caller: &ParticipantId,
        room_id: &RoomId,
    ) -> Result<Room, UseCaseError> {
        let room = self.load_as_host(caller, room_id, "finish the quiz").await?;
        Self::require_kind(&room, RoomKind::Quiz)?;

        let finished = self.rooms.finish_quiz(room_id).await?;
        if room.status != RoomStatus::Finished {
            tracing::info!(room_id = %room_id, "Quiz finished");
            self.broadcaster
                .broadcast(
                    room_id,
                    &ServerEvent::new(
                        room_id,
                        EventPayload::StatusChange {
                            status: RoomStatus::Finished,
                        },
                    ),
                )
                .await;
            self.broadcast_scores(room_id).await;
        }
        Ok(finished)
    }
}
