//! # BoardService
//!
//! The posting engine. Thread creation and replies each run as one
//! optimistic [`Transaction`] over the board document and the thread's dat,
//! so either both documents change or neither does. Rendering reads are
//! plain single-document reads.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tracing::{info, warn};

use crate::dat::{
    append_line, escape_field, overflow_line, parse_line, split_trip, DatLine, PosterName,
};
use crate::encoding::{to_wire, wire_len};
use crate::error::{AppError, Result};
use crate::models::{Board, Dat, NewPost, PostReceipt, PostTarget, Subject};
use crate::settings::BoardSettings;
use crate::subject::{self, Bump};
use crate::traits::{DocumentStore, IdentityProvider};
use crate::transaction::Transaction;
use crate::transfer::http_date;
use crate::views::{DatJson, DatJsonReply, MessageEntry, SubjectEntry, SubjectJson};

/// Process-wide values fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub started_at: DateTime<Utc>,
    /// Offset used for dates shown to posters.
    pub tz: FixedOffset,
}

impl Environment {
    pub fn new(started_at: DateTime<Utc>, tz: FixedOffset) -> Self {
        Self { started_at, tz }
    }

    /// Calendar date of service start; poster IDs rotate with it.
    pub fn service_date(&self) -> NaiveDate {
        self.started_at.with_timezone(&self.tz).date_naive()
    }

    pub fn precure(&self) -> i64 {
        self.started_at.timestamp()
    }
}

pub struct BoardService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    env: Environment,
}

impl BoardService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        env: Environment,
    ) -> Self {
        Self {
            store,
            identity,
            env,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Dispatches a post to [`Self::create_thread`] or [`Self::write_dat`].
    pub async fn post(
        &self,
        settings: &BoardSettings,
        board: &str,
        target: &PostTarget,
        post: &NewPost,
        now: DateTime<Utc>,
    ) -> Result<PostReceipt> {
        match target {
            PostTarget::NewThread { title } => {
                self.create_thread(settings, board, title, post, now).await
            }
            PostTarget::Reply { thread_key } => {
                self.write_dat(settings, board, thread_key, post, now).await
            }
        }
    }

    /// Starts a thread keyed by the unix second of `now`.
    pub async fn create_thread(
        &self,
        settings: &BoardSettings,
        board: &str,
        title: &str,
        post: &NewPost,
        now: DateTime<Utc>,
    ) -> Result<PostReceipt> {
        let thread_key = now.timestamp().to_string();
        let mut tx = Transaction::begin(self.store.as_ref());

        let mut doc = tx
            .get_board(board)
            .await?
            .ok_or_else(|| AppError::NotFound("board", board.to_owned()))?;
        if doc.position(&thread_key).is_some() {
            return Err(AppError::DuplicateThread(thread_key));
        }
        if doc.subjects.len() >= settings.max_threads {
            return Err(AppError::ThreadLimitExceeded(settings.max_threads));
        }
        if doc.write_count >= settings.write_entity_limit {
            return Err(AppError::DailyWriteLimitExceeded(settings.write_entity_limit));
        }

        let poster_id = self.poster_id(board, post);
        let name = self.poster_name(settings, &post.name);
        let line = DatLine {
            name: &name,
            mail: &post.mail,
            posted_at: &now.with_timezone(&self.env.tz),
            poster_id: &poster_id,
            message: &post.message,
            title: Some(title),
        }
        .render();

        doc.subjects.insert(
            0,
            Subject {
                thread_key: thread_key.clone(),
                title: escape_field(title),
                message_count: 1,
                last_modified: now,
            },
        );
        doc.write_count += 1;

        tx.put_dat(
            board,
            &thread_key,
            Dat {
                content: line,
                last_modified: now,
            },
        );
        tx.put_board(board, doc);
        tx.commit().await?;

        info!(board, thread_key = %thread_key, poster_id = %poster_id, "thread created");
        Ok(PostReceipt {
            board: board.to_owned(),
            thread_key,
            res_num: 1,
            poster_id,
            posted_at: now,
            over_capacity: false,
        })
    }

    /// Appends a reply to an existing thread and bumps it unless sage.
    pub async fn write_dat(
        &self,
        settings: &BoardSettings,
        board: &str,
        thread_key: &str,
        post: &NewPost,
        now: DateTime<Utc>,
    ) -> Result<PostReceipt> {
        let mut tx = Transaction::begin(self.store.as_ref());

        let mut dat = tx
            .get_dat(board, thread_key)
            .await?
            .ok_or_else(|| AppError::NotFound("thread", thread_key.to_owned()))?;
        let mut doc = tx
            .get_board(board)
            .await?
            .ok_or_else(|| AppError::NotFound("board", board.to_owned()))?;
        let pos = doc.position(thread_key).ok_or_else(|| {
            AppError::InconsistentState(format!("{board}/{thread_key} has a dat but no subject"))
        })?;
        if doc.write_count >= settings.write_entity_limit {
            return Err(AppError::DailyWriteLimitExceeded(settings.write_entity_limit));
        }
        if wire_len(&dat.content) >= settings.dat_capacity {
            return Err(AppError::DatCapacityExceeded(settings.dat_capacity));
        }

        let poster_id = self.poster_id(board, post);
        let name = self.poster_name(settings, &post.name);
        let entry = &mut doc.subjects[pos];
        let res_num = entry.message_count + 1;
        let line = DatLine {
            name: &name,
            mail: &post.mail,
            posted_at: &now.with_timezone(&self.env.tz),
            poster_id: &poster_id,
            message: &post.message,
            title: None,
        }
        .render();
        append_line(&mut dat.content, &line);
        dat.last_modified = now;

        let mut message_count = res_num;
        if res_num == settings.max_messages {
            append_line(&mut dat.content, &overflow_line(settings.max_messages));
            message_count += 1;
        }
        let over_capacity = res_num > settings.max_messages;
        if over_capacity {
            warn!(board, thread_key, res_num, "write past message cap");
        }
        entry.message_count = message_count;
        entry.last_modified = now;

        subject::reorder(&mut doc.subjects, pos, Bump::from_mail(&post.mail));
        doc.write_count += 1;

        tx.put_dat(board, thread_key, dat);
        tx.put_board(board, doc);
        tx.commit().await?;

        info!(board, thread_key, res_num, poster_id = %poster_id, "reply written");
        Ok(PostReceipt {
            board: board.to_owned(),
            thread_key: thread_key.to_owned(),
            res_num,
            poster_id,
            posted_at: now,
            over_capacity,
        })
    }

    pub async fn board(&self, name: &str) -> Result<Board> {
        self.store
            .get_board(name)
            .await?
            .map(|v| v.doc)
            .ok_or_else(|| AppError::NotFound("board", name.to_owned()))
    }

    pub async fn dat(&self, board: &str, thread_key: &str) -> Result<Dat> {
        self.store
            .get_dat(board, thread_key)
            .await?
            .map(|v| v.doc)
            .ok_or_else(|| AppError::NotFound("thread", thread_key.to_owned()))
    }

    /// Renders `subject.txt` from the current board state.
    pub async fn subject_txt(&self, board: &str) -> Result<String> {
        Ok(subject::subject_txt(&self.board(board).await?))
    }

    /// The first `limit` threads of a board in live order.
    pub async fn subject_json(&self, board: &str, limit: usize) -> Result<SubjectJson> {
        let doc = self.board(board).await?;
        let subjects = doc
            .subjects
            .into_iter()
            .take(limit)
            .map(|s| SubjectEntry {
                last_modified: s
                    .last_modified
                    .with_timezone(&self.env.tz)
                    .format("%Y/%m/%d %H:%M:%S")
                    .to_string(),
                thread_key: s.thread_key,
                thread_title: s.title,
                message_count: s.message_count,
            })
            .collect();
        Ok(SubjectJson {
            subjects,
            precure: self.env.precure(),
        })
    }

    /// Up to `limit` parsed messages following the first `after` lines.
    pub async fn dat_json(
        &self,
        board: &str,
        thread_key: &str,
        if_modified_since: Option<&str>,
        after: usize,
        limit: usize,
    ) -> Result<DatJsonReply> {
        let dat = self.dat(board, thread_key).await?;
        let last_modified = http_date(&dat.last_modified);
        if if_modified_since == Some(last_modified.as_str()) {
            return Ok(DatJsonReply::NotModified);
        }

        let lines: Vec<&str> = dat.content.split('\n').collect();
        let thread_title = lines
            .first()
            .and_then(|l| parse_line(l))
            .map(|p| p.title.to_owned())
            .unwrap_or_default();
        let messages = lines
            .iter()
            .enumerate()
            .skip(after)
            .take(limit)
            .filter_map(|(i, l)| {
                parse_line(l).map(|p| MessageEntry {
                    num: i + 1,
                    name: p.name.to_owned(),
                    mail: p.mail.to_owned(),
                    date_and_id: p.date_and_id.to_owned(),
                    content: p.message.to_owned(),
                })
            })
            .collect();

        Ok(DatJsonReply::Messages(DatJson {
            messages,
            thread_title,
            last_modified,
            precure: self.env.precure(),
        }))
    }

    /// Creates an empty board.
    pub async fn create_board(&self, name: &str) -> Result<()> {
        let mut tx = Transaction::begin(self.store.as_ref());
        if tx.get_board(name).await?.is_some() {
            return Err(AppError::Conflict(format!("board {name} already exists")));
        }
        tx.put_board(name, Board::default());
        tx.commit().await?;
        info!(board = name, "board created");
        Ok(())
    }

    /// Sum of the write counters of every board.
    pub async fn total_write_count(&self) -> Result<u64> {
        let mut total = 0;
        for name in self.store.list_boards().await? {
            if let Some(board) = self.store.get_board(&name).await? {
                total += u64::from(board.doc.write_count);
            }
        }
        Ok(total)
    }

    /// Starts a new write period on every board. Returns how many boards had
    /// a non-zero counter.
    pub async fn reset_write_counts(&self) -> Result<usize> {
        let mut tx = Transaction::begin(self.store.as_ref());
        let mut reset = 0;
        for name in self.store.list_boards().await? {
            let Some(mut board) = tx.get_board(&name).await? else {
                continue;
            };
            if board.write_count == 0 {
                continue;
            }
            board.write_count = 0;
            tx.put_board(&name, board);
            reset += 1;
        }
        tx.commit().await?;
        info!(boards = reset, "write counts reset");
        Ok(reset)
    }

    fn poster_id(&self, board: &str, post: &NewPost) -> String {
        self.identity
            .poster_id(&post.poster_addr, board, self.env.service_date())
    }

    fn poster_name(&self, settings: &BoardSettings, raw: &str) -> PosterName {
        let (name, secret) = split_trip(raw);
        let mut poster = PosterName {
            name: name.to_owned(),
            trip: secret.map(|s| self.identity.trip(&to_wire(s))),
        };
        if poster.is_empty() {
            poster.name = settings.noname_name.clone();
        }
        poster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::line_count;
    use crate::memory::MemoryStore;
    use crate::models::Versioned;
    use crate::traits::{Commit, MockDocumentStore, MockIdentityProvider};
    use chrono::{Duration, TimeZone};

    const BOARD: &str = "news4vip";

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn env() -> Environment {
        Environment::new(Utc.with_ymd_and_hms(2019, 11, 23, 0, 0, 0).unwrap(), jst())
    }

    // 2019/11/23 22:29:01.123 JST
    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 11, 23, 13, 29, 1).unwrap() + Duration::milliseconds(123)
    }

    fn identity() -> MockIdentityProvider {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_poster_id()
            .returning(|_, _, _| "ABC".to_string());
        identity.expect_trip().returning(|_| "TRIP".to_string());
        identity
    }

    fn service_with(store: Arc<MemoryStore>, identity: MockIdentityProvider) -> BoardService {
        BoardService::new(store, Arc::new(identity), env())
    }

    fn service() -> (Arc<MemoryStore>, BoardService) {
        let store = Arc::new(MemoryStore::new());
        store.insert_board(BOARD, Board::default());
        (store.clone(), service_with(store, identity()))
    }

    fn post(mail: &str) -> NewPost {
        NewPost {
            name: "名前".to_string(),
            mail: mail.to_string(),
            message: "本文".to_string(),
            poster_addr: "127.0.0.1".to_string(),
        }
    }

    async fn keys(svc: &BoardService) -> Vec<String> {
        svc.board(BOARD)
            .await
            .unwrap()
            .subjects
            .into_iter()
            .map(|s| s.thread_key)
            .collect()
    }

    #[tokio::test]
    async fn create_thread_writes_first_line() {
        let (_, svc) = service();
        let settings = BoardSettings::default();

        let receipt = svc
            .create_thread(&settings, BOARD, "スレタイ", &post("メール"), t0())
            .await
            .unwrap();

        assert_eq!(receipt.thread_key, t0().timestamp().to_string());
        assert_eq!(receipt.res_num, 1);
        assert_eq!(receipt.poster_id, "ABC");
        assert_eq!(receipt.post_date(), format!("{}.123", t0().timestamp()));

        let dat = svc.dat(BOARD, &receipt.thread_key).await.unwrap();
        assert_eq!(
            dat.content,
            "名前<>メール<>2019/11/23(土) 22:29:01.123 ID:ABC<> 本文 <>スレタイ"
        );

        let board = svc.board(BOARD).await.unwrap();
        assert_eq!(board.write_count, 1);
        assert_eq!(board.subjects[0].title, "スレタイ");
        assert_eq!(board.subjects[0].message_count, 1);
        assert_eq!(board.subjects[0].last_modified, t0());
    }

    #[tokio::test]
    async fn title_is_stored_escaped() {
        let (_, svc) = service();
        let receipt = svc
            .create_thread(&BoardSettings::default(), BOARD, "<b>\"a\"</b>", &post(""), t0())
            .await
            .unwrap();
        let txt = svc.subject_txt(BOARD).await.unwrap();
        assert_eq!(
            txt,
            format!(
                "{}.dat<>&lt;b&gt;&#34;a&#34;&lt;/b&gt; \t (1)\n",
                receipt.thread_key
            )
        );
    }

    #[tokio::test]
    async fn replies_append_one_line_each() {
        let (_, svc) = service();
        let settings = BoardSettings::default();
        let key = svc
            .create_thread(&settings, BOARD, "スレタイ", &post(""), t0())
            .await
            .unwrap()
            .thread_key;

        for n in 1..=5 {
            let now = t0() + Duration::seconds(n);
            let receipt = svc
                .write_dat(&settings, BOARD, &key, &post(""), now)
                .await
                .unwrap();
            assert_eq!(receipt.res_num, n as u32 + 1);
            assert!(!receipt.over_capacity);
        }

        let dat = svc.dat(BOARD, &key).await.unwrap();
        assert_eq!(line_count(&dat.content), 6);
        assert!(dat.content.lines().skip(1).all(|l| l.ends_with(" <>")));
        assert_eq!(dat.last_modified, t0() + Duration::seconds(5));

        let board = svc.board(BOARD).await.unwrap();
        assert_eq!(board.subjects[0].message_count, 6);
        assert_eq!(board.write_count, 6);
    }

    #[tokio::test]
    async fn age_bumps_and_sage_keeps_position() {
        let (_, svc) = service();
        let settings = BoardSettings::default();
        let first = svc
            .create_thread(&settings, BOARD, "1", &post(""), t0())
            .await
            .unwrap()
            .thread_key;
        let second = svc
            .create_thread(&settings, BOARD, "2", &post(""), t0() + Duration::seconds(1))
            .await
            .unwrap()
            .thread_key;
        assert_eq!(keys(&svc).await, vec![second.clone(), first.clone()]);

        svc.write_dat(&settings, BOARD, &first, &post("sage"), t0() + Duration::seconds(2))
            .await
            .unwrap();
        assert_eq!(keys(&svc).await, vec![second.clone(), first.clone()]);

        svc.write_dat(&settings, BOARD, &first, &post(""), t0() + Duration::seconds(3))
            .await
            .unwrap();
        assert_eq!(keys(&svc).await, vec![first, second]);
    }

    #[tokio::test]
    async fn thread_limit_boundary() {
        let (_, svc) = service();
        let settings = BoardSettings {
            max_threads: 2,
            ..BoardSettings::default()
        };
        for n in 0..2 {
            svc.create_thread(&settings, BOARD, "t", &post(""), t0() + Duration::seconds(n))
                .await
                .unwrap();
        }
        let err = svc
            .create_thread(&settings, BOARD, "t", &post(""), t0() + Duration::seconds(2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ThreadLimitExceeded(2)));
    }

    #[tokio::test]
    async fn write_limit_applies_to_both_operations() {
        let (_, svc) = service();
        let settings = BoardSettings {
            write_entity_limit: 1,
            ..BoardSettings::default()
        };
        let key = svc
            .create_thread(&settings, BOARD, "t", &post(""), t0())
            .await
            .unwrap()
            .thread_key;

        let err = svc
            .write_dat(&settings, BOARD, &key, &post(""), t0() + Duration::seconds(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DailyWriteLimitExceeded(1)));

        let err = svc
            .create_thread(&settings, BOARD, "t", &post(""), t0() + Duration::seconds(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DailyWriteLimitExceeded(1)));
    }

    #[tokio::test]
    async fn same_second_thread_is_duplicate() {
        let (_, svc) = service();
        let settings = BoardSettings::default();
        svc.create_thread(&settings, BOARD, "t", &post(""), t0())
            .await
            .unwrap();
        let err = svc
            .create_thread(&settings, BOARD, "t", &post(""), t0() + Duration::milliseconds(500))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateThread(_)));
    }

    #[tokio::test]
    async fn missing_documents() {
        let (store, svc) = service();
        let settings = BoardSettings::default();

        let err = svc
            .create_thread(&settings, "poverty", "t", &post(""), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("board", _)));

        let err = svc
            .write_dat(&settings, BOARD, "1234567890", &post(""), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("thread", _)));

        store.insert_dat(
            BOARD,
            "1234567890",
            Dat {
                content: "orphan".to_string(),
                last_modified: t0(),
            },
        );
        let err = svc
            .write_dat(&settings, BOARD, "1234567890", &post(""), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InconsistentState(_)));
    }

    #[tokio::test]
    async fn overflow_marker_closes_thread_at_cap() {
        let (_, svc) = service();
        let settings = BoardSettings {
            max_messages: 3,
            ..BoardSettings::default()
        };
        let key = svc
            .create_thread(&settings, BOARD, "t", &post(""), t0())
            .await
            .unwrap()
            .thread_key;
        for n in 1..=2 {
            svc.write_dat(&settings, BOARD, &key, &post(""), t0() + Duration::seconds(n))
                .await
                .unwrap();
        }

        let dat = svc.dat(BOARD, &key).await.unwrap();
        assert_eq!(line_count(&dat.content), 4);
        assert!(dat.content.ends_with(&overflow_line(3)));
        assert_eq!(svc.board(BOARD).await.unwrap().subjects[0].message_count, 4);

        let receipt = svc
            .write_dat(&settings, BOARD, &key, &post(""), t0() + Duration::seconds(3))
            .await
            .unwrap();
        assert_eq!(receipt.res_num, 5);
        assert!(receipt.over_capacity);
        assert_eq!(svc.board(BOARD).await.unwrap().subjects[0].message_count, 5);
    }

    #[tokio::test]
    async fn full_dat_refuses_replies() {
        let (_, svc) = service();
        let settings = BoardSettings {
            dat_capacity: 10,
            ..BoardSettings::default()
        };
        let key = svc
            .create_thread(&settings, BOARD, "t", &post(""), t0())
            .await
            .unwrap()
            .thread_key;
        let err = svc
            .write_dat(&settings, BOARD, &key, &post(""), t0() + Duration::seconds(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DatCapacityExceeded(10)));
    }

    #[tokio::test]
    async fn empty_name_falls_back_and_trip_sees_wire_bytes() {
        let store = Arc::new(MemoryStore::new());
        store.insert_board(BOARD, Board::default());
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_poster_id()
            .withf(|addr, board, date| {
                addr == "127.0.0.1"
                    && board == BOARD
                    && *date == NaiveDate::from_ymd_opt(2019, 11, 23).unwrap()
            })
            .returning(|_, _, _| "ABC".to_string());
        identity
            .expect_trip()
            .withf(|secret| secret == [0x82, 0xa0].as_slice())
            .times(1)
            .returning(|_| "TRIP".to_string());
        let svc = service_with(store, identity);
        let settings = BoardSettings::default();

        let anonymous = NewPost {
            name: String::new(),
            ..post("")
        };
        let key = svc
            .create_thread(&settings, BOARD, "t", &anonymous, t0())
            .await
            .unwrap()
            .thread_key;

        let tripped = NewPost {
            name: "名前#あ".to_string(),
            ..post("")
        };
        svc.write_dat(&settings, BOARD, &key, &tripped, t0() + Duration::seconds(1))
            .await
            .unwrap();

        let dat = svc.dat(BOARD, &key).await.unwrap();
        let lines: Vec<&str> = dat.content.lines().collect();
        assert!(lines[0].starts_with("名無しさん<>"));
        assert!(lines[1].starts_with("名前 </b>◆TRIP <b><>"));
    }

    #[tokio::test]
    async fn commit_conflict_is_retryable() {
        let mut store = MockDocumentStore::new();
        store.expect_get_dat().returning(|_, _| {
            Ok(Some(Versioned {
                doc: Dat {
                    content: "a".to_string(),
                    last_modified: t0(),
                },
                version: 1,
            }))
        });
        store.expect_get_board().returning(|_| {
            Ok(Some(Versioned {
                doc: Board {
                    subjects: vec![Subject {
                        thread_key: "100".to_string(),
                        title: "t".to_string(),
                        message_count: 1,
                        last_modified: t0(),
                    }],
                    write_count: 0,
                },
                version: 1,
            }))
        });
        store.expect_commit().returning(|_| Ok(Commit::Conflict));

        let svc = BoardService::new(Arc::new(store), Arc::new(identity()), env());
        let err = svc
            .write_dat(&BoardSettings::default(), BOARD, "100", &post(""), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TransactionConflict));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn post_dispatches_on_target() {
        let (_, svc) = service();
        let settings = BoardSettings::default();
        let created = svc
            .post(
                &settings,
                BOARD,
                &PostTarget::NewThread {
                    title: "t".to_string(),
                },
                &post(""),
                t0(),
            )
            .await
            .unwrap();
        let replied = svc
            .post(
                &settings,
                BOARD,
                &PostTarget::Reply {
                    thread_key: created.thread_key.clone(),
                },
                &post(""),
                t0() + Duration::seconds(1),
            )
            .await
            .unwrap();
        assert_eq!(replied.thread_key, created.thread_key);
        assert_eq!(replied.res_num, 2);
    }

    #[tokio::test]
    async fn json_views() {
        let (_, svc) = service();
        let settings = BoardSettings::default();
        let key = svc
            .create_thread(&settings, BOARD, "スレタイ", &post(""), t0())
            .await
            .unwrap()
            .thread_key;
        for n in 1..=3 {
            svc.write_dat(&settings, BOARD, &key, &post("sage"), t0() + Duration::seconds(n))
                .await
                .unwrap();
        }

        let subjects = svc.subject_json(BOARD, 10).await.unwrap();
        assert_eq!(subjects.precure, env().started_at.timestamp());
        assert_eq!(subjects.subjects.len(), 1);
        assert_eq!(subjects.subjects[0].thread_title, "スレタイ");
        assert_eq!(subjects.subjects[0].message_count, 4);
        assert_eq!(subjects.subjects[0].last_modified, "2019/11/23 22:29:04");

        let DatJsonReply::Messages(all) = svc.dat_json(BOARD, &key, None, 0, 10).await.unwrap()
        else {
            panic!("expected messages");
        };
        assert_eq!(all.thread_title, "スレタイ");
        assert_eq!(all.messages.len(), 4);
        assert_eq!(all.messages[0].num, 1);
        assert_eq!(all.messages[0].content, "本文");
        assert_eq!(all.messages[3].mail, "sage");

        let DatJsonReply::Messages(tail) =
            svc.dat_json(BOARD, &key, Some("old"), 2, 10).await.unwrap()
        else {
            panic!("expected messages");
        };
        assert_eq!(
            tail.messages.iter().map(|m| m.num).collect::<Vec<_>>(),
            vec![3, 4]
        );

        let unchanged = svc
            .dat_json(BOARD, &key, Some(&all.last_modified), 0, 10)
            .await
            .unwrap();
        assert_eq!(unchanged, DatJsonReply::NotModified);
    }

    #[tokio::test]
    async fn maintenance_operations() {
        let (_, svc) = service();
        let settings = BoardSettings::default();

        svc.create_board("poverty").await.unwrap();
        let err = svc.create_board("poverty").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        svc.create_thread(&settings, BOARD, "t", &post(""), t0())
            .await
            .unwrap();
        svc.create_thread(&settings, "poverty", "t", &post(""), t0())
            .await
            .unwrap();
        svc.create_thread(&settings, "poverty", "t", &post(""), t0() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(svc.total_write_count().await.unwrap(), 3);

        assert_eq!(svc.reset_write_counts().await.unwrap(), 2);
        assert_eq!(svc.total_write_count().await.unwrap(), 0);
        assert_eq!(svc.reset_write_counts().await.unwrap(), 0);
    }
}
