use dbhelper::{
    DbError, Driver, Error, Executor, GenericSqlWriter, Pool, QueryResult, Result, RowLabeled,
    RowsAffected, Statement, Transaction, Value,
    stream::{self, Stream, StreamExt},
};
use log::LevelFilter;
use std::{
    collections::VecDeque,
    env,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

pub fn row(labels: &[&str], values: Vec<Value>) -> RowLabeled {
    RowLabeled::new(
        labels.iter().map(|v| v.to_string()).collect::<Vec<_>>().into(),
        values.into_boxed_slice(),
    )
}

/// Where a statement was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Pool,
    Transaction(usize),
}

#[derive(Debug, Clone)]
pub struct Executed {
    pub origin: Origin,
    pub statement: Statement,
}

/// Scripted outcome of the next statement.
#[derive(Debug, Clone)]
pub enum Response {
    Rows(Vec<RowLabeled>),
    Affected(RowsAffected),
    Error(DbError),
}

#[derive(Default, Debug)]
struct State {
    executed: Vec<Executed>,
    responses: VecDeque<Response>,
    events: Vec<String>,
    transactions: usize,
    fail_commit: bool,
    fail_when: Option<String>,
    delay: Option<Duration>,
}

#[derive(Default, Debug, Clone, Copy)]
pub struct MockDriver;

impl Driver for MockDriver {
    type SqlWriter = GenericSqlWriter;

    const NAME: &'static str = "mock";

    fn sql_writer(&self) -> GenericSqlWriter {
        GenericSqlWriter::new()
    }
}

/// In memory engine recording every statement it receives.
///
/// Statements without a scripted response return no rows when they are selects,
/// inserts report one affected row per value tuple and anything else zero.
#[derive(Default, Debug, Clone)]
pub struct MockPool {
    driver: MockDriver,
    state: Arc<Mutex<State>>,
}

impl MockPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, response: Response) -> &Self {
        self.state.lock().unwrap().responses.push_back(response);
        self
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.executed()
            .into_iter()
            .map(|v| v.statement.sql)
            .collect()
    }

    pub fn last(&self) -> Executed {
        self.executed().pop().expect("No statement was executed")
    }

    /// Transaction lifecycle, like `begin 1`, `commit 1`, `rollback 2`.
    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn fail_commit(&self) {
        self.state.lock().unwrap().fail_commit = true;
    }

    /// Fail every statement whose text contains `fragment`.
    pub fn fail_when(&self, fragment: &str) {
        self.state.lock().unwrap().fail_when = Some(fragment.to_string());
    }

    /// Wait before answering any statement or opening a transaction.
    pub fn delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    fn respond(
        &self,
        origin: Origin,
        statement: Statement,
    ) -> impl Stream<Item = Result<QueryResult>> + Send + use<> {
        let (items, delay) = {
            let mut state = self.state.lock().unwrap();
            let failing = state
                .fail_when
                .as_deref()
                .is_some_and(|v| statement.sql.contains(v));
            let response = if failing {
                Response::Error(DbError::InvalidState(format!(
                    "Statement refused by the engine: {}",
                    statement.sql
                )))
            } else {
                state
                    .responses
                    .pop_front()
                    .unwrap_or_else(|| default_response(&statement.sql))
            };
            state.executed.push(Executed { origin, statement });
            let items: Vec<Result<QueryResult>> = match response {
                Response::Rows(rows) => rows.into_iter().map(|v| Ok(v.into())).collect(),
                Response::Affected(affected) => vec![Ok(affected.into())],
                Response::Error(e) => vec![Err(Error::new(e))],
            };
            (items, state.delay)
        };
        stream::once(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            stream::iter(items)
        })
        .flatten()
    }
}

fn default_response(sql: &str) -> Response {
    if sql.starts_with("SELECT") {
        Response::Rows(Vec::new())
    } else {
        Response::Affected(RowsAffected {
            rows_affected: if sql.starts_with("INSERT") {
                sql.matches("\n(").count() as u64
            } else {
                0
            },
            last_affected_id: None,
        })
    }
}

impl Executor for MockPool {
    type Driver = MockDriver;

    fn driver(&self) -> &MockDriver {
        &self.driver
    }

    fn run(&self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.respond(Origin::Pool, statement)
    }
}

impl Pool for MockPool {
    type Transaction = MockTransaction;

    async fn connect(url: &str) -> Result<Self> {
        if !url.starts_with("mock://") {
            return Err(Error::msg(format!("Unexpected url `{url}`")));
        }
        Ok(MockPool::new())
    }

    async fn begin(&self) -> Result<MockTransaction> {
        let (id, delay) = {
            let mut state = self.state.lock().unwrap();
            state.transactions += 1;
            let id = state.transactions;
            state.events.push(format!("begin {id}"));
            (id, state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(MockTransaction {
            id,
            pool: self.clone(),
            finished: Default::default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MockTransaction {
    pub id: usize,
    pool: MockPool,
    finished: Arc<AtomicBool>,
}

impl MockTransaction {
    fn finish(&self, action: &str) -> Result<()> {
        if self.finished.swap(true, Ordering::SeqCst) {
            return Err(Error::new(DbError::InvalidState(
                "The transaction is already finished".into(),
            )));
        }
        let mut state = self.pool.state.lock().unwrap();
        state.events.push(format!("{action} {}", self.id));
        if action == "commit" && state.fail_commit {
            return Err(Error::msg("The engine refused to commit"));
        }
        Ok(())
    }
}

impl Executor for MockTransaction {
    type Driver = MockDriver;

    fn driver(&self) -> &MockDriver {
        &self.pool.driver
    }

    fn run(&self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        if self.finished.load(Ordering::SeqCst) {
            return stream::iter(vec![Err(Error::new(DbError::InvalidState(
                "The transaction is already finished".into(),
            )))])
            .left_stream();
        }
        self.pool
            .respond(Origin::Transaction(self.id), statement)
            .right_stream()
    }
}

impl Transaction for MockTransaction {
    async fn commit(&self) -> Result<()> {
        self.finish("commit")
    }

    async fn rollback(&self) -> Result<()> {
        self.finish("rollback")
    }
}
