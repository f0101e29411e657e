//! Parcel repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Map `Parcel` values onto rows of the `parcel` table.
//! - Provide atomic single-row create/read/update/delete operations.
//!
//! # Invariants
//! - `add` validates before writing and never trusts a caller `number`.
//! - Address changes and deletion require `status = 'registered'`; the
//!   status check and the write share one IMMEDIATE transaction.
//! - `advance_status` is a compare-and-set on the current status.
//! - Read paths reject undecodable rows instead of substituting defaults.

use crate::db::DbError;
use crate::model::parcel::{ClientId, Parcel, ParcelNumber, ParcelStatus, ParcelValidationError};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PARCEL_TABLE: &str = "parcel";
const PARCEL_COLUMNS: [&str; 5] = ["number", "client", "status", "address", "created_at"];

const PARCEL_SELECT_SQL: &str = "SELECT
    number,
    client,
    status,
    address,
    created_at
FROM parcel";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from parcel persistence operations.
#[derive(Debug)]
pub enum RepoError {
    /// Input parcel failed validation; nothing was written.
    Validation(ParcelValidationError),
    /// Connectivity, query or constraint failure in SQLite.
    Db(DbError),
    /// No parcel row carries this number.
    NotFound(ParcelNumber),
    /// The parcel's current status forbids the requested mutation.
    InvalidState {
        number: ParcelNumber,
        status: ParcelStatus,
    },
    /// A stored row cannot be decoded into a valid `Parcel`.
    InvalidData(String),
    /// Connection does not expose the `parcel` table.
    MissingRequiredTable(&'static str),
    /// `parcel` table lacks an expected column.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(number) => write!(f, "parcel not found: {number}"),
            Self::InvalidState { number, status } => {
                write!(f, "parcel {number} cannot be modified in status `{status}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted parcel data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "parcel store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "parcel store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::InvalidState { .. }
            | Self::InvalidData(_)
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<ParcelValidationError> for RepoError {
    fn from(value: ParcelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for parcel records.
pub trait ParcelRepository {
    /// Inserts a parcel and returns the number assigned to it.
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber>;
    /// Loads one parcel; `NotFound` when absent.
    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel>;
    /// Removes a registered parcel.
    fn delete(&self, number: ParcelNumber) -> RepoResult<()>;
    /// Replaces the address of a registered parcel.
    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()>;
    /// Replaces the status, without transition checks.
    fn set_status(&self, number: ParcelNumber, status: ParcelStatus) -> RepoResult<()>;
    /// Moves the status from `from` to `to` only if it is still `from`.
    ///
    /// Returns `InvalidState` carrying the current status when another
    /// writer changed it first; nothing is written then.
    fn advance_status(
        &self,
        number: ParcelNumber,
        from: ParcelStatus,
        to: ParcelStatus,
    ) -> RepoResult<()>;
    /// Lists every parcel owned by `client`; empty when there are none.
    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>>;
}

/// SQLite-backed parcel store.
///
/// Borrows a connection opened elsewhere; connection lifetime is the
/// caller's concern.
pub struct SqliteParcelStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParcelStore<'conn> {
    /// Constructs a store after checking the `parcel` table shape.
    ///
    /// # Errors
    /// - `MissingRequiredTable` / `MissingRequiredColumn` on an unprovisioned
    ///   connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_parcel_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn begin_write(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl ParcelRepository for SqliteParcelStore<'_> {
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        parcel.validate()?;

        self.conn.execute(
            "INSERT INTO parcel (client, status, address, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                parcel.client,
                parcel.status.as_str(),
                parcel.address.as_str(),
                parcel.created_at.as_str(),
            ],
        )?;

        let number = self.conn.last_insert_rowid();
        info!(
            "event=parcel_add module=repo status=ok number={number} client={}",
            parcel.client
        );
        Ok(number)
    }

    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{PARCEL_SELECT_SQL} WHERE number = ?1;"))?;
        let mut rows = stmt.query([number])?;
        if let Some(row) = rows.next()? {
            return parse_parcel_row(row);
        }

        Err(RepoError::NotFound(number))
    }

    fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
        let tx = self.begin_write()?;
        ensure_registered(&tx, number)?;
        tx.execute("DELETE FROM parcel WHERE number = ?1;", [number])?;
        tx.commit()?;

        info!("event=parcel_delete module=repo status=ok number={number}");
        Ok(())
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        let tx = self.begin_write()?;
        ensure_registered(&tx, number)?;
        tx.execute(
            "UPDATE parcel SET address = ?2 WHERE number = ?1;",
            params![number, address],
        )?;
        tx.commit()?;

        info!("event=parcel_set_address module=repo status=ok number={number}");
        Ok(())
    }

    fn set_status(&self, number: ParcelNumber, status: ParcelStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE parcel SET status = ?2 WHERE number = ?1;",
            params![number, status.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(number));
        }

        info!(
            "event=parcel_set_status module=repo status=ok number={number} parcel_status={status}"
        );
        Ok(())
    }

    fn advance_status(
        &self,
        number: ParcelNumber,
        from: ParcelStatus,
        to: ParcelStatus,
    ) -> RepoResult<()> {
        let tx = self.begin_write()?;
        let current = current_status(&tx, number)?;
        if current != from {
            return Err(RepoError::InvalidState {
                number,
                status: current,
            });
        }
        tx.execute(
            "UPDATE parcel SET status = ?3 WHERE number = ?1 AND status = ?2;",
            params![number, from.as_str(), to.as_str()],
        )?;
        tx.commit()?;

        info!(
            "event=parcel_advance_status module=repo status=ok number={number} from={from} to={to}"
        );
        Ok(())
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{PARCEL_SELECT_SQL} WHERE client = ?1 ORDER BY number ASC;"
        ))?;
        let mut rows = stmt.query([client])?;
        let mut parcels = Vec::new();
        while let Some(row) = rows.next()? {
            parcels.push(parse_parcel_row(row)?);
        }

        debug!(
            "event=parcel_get_by_client module=repo status=ok client={client} count={}",
            parcels.len()
        );
        Ok(parcels)
    }
}

/// Fails unless the parcel exists and is still `registered`.
fn ensure_registered(tx: &Transaction<'_>, number: ParcelNumber) -> RepoResult<()> {
    let status = current_status(tx, number)?;
    if !status.is_mutable() {
        return Err(RepoError::InvalidState { number, status });
    }
    Ok(())
}

fn current_status(tx: &Transaction<'_>, number: ParcelNumber) -> RepoResult<ParcelStatus> {
    let status_text: Option<String> = tx
        .query_row(
            "SELECT status FROM parcel WHERE number = ?1;",
            [number],
            |row| row.get(0),
        )
        .optional()?;
    match status_text {
        Some(text) => parse_status(&text),
        None => Err(RepoError::NotFound(number)),
    }
}

fn parse_parcel_row(row: &Row<'_>) -> RepoResult<Parcel> {
    let status_text: String = row.get("status")?;
    let parcel = Parcel {
        number: row.get("number")?,
        client: row.get("client")?,
        status: parse_status(&status_text)?,
        address: row.get("address")?,
        created_at: row.get("created_at")?,
    };
    parcel
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("parcel {}: {err}", parcel.number)))?;
    Ok(parcel)
}

fn parse_status(value: &str) -> RepoResult<ParcelStatus> {
    value.parse().map_err(|_| {
        RepoError::InvalidData(format!("invalid status `{value}` in parcel.status"))
    })
}

fn ensure_parcel_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, PARCEL_TABLE)? {
        return Err(RepoError::MissingRequiredTable(PARCEL_TABLE));
    }

    for column in PARCEL_COLUMNS {
        if !table_has_column(conn, PARCEL_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: PARCEL_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
