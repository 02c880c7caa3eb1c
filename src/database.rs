use crate::types::{DrawRecord, PrizeTier, Ticket};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS draw_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL UNIQUE,
            prize1 TEXT NOT NULL,
            first3_a TEXT NOT NULL,
            first3_b TEXT NOT NULL,
            last3_a TEXT NOT NULL,
            last3_b TEXT NOT NULL,
            last2 TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tickets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticket_number TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            amount_paid INTEGER NOT NULL,
            purchase_date TEXT NOT NULL,
            draw_date_ref TEXT NOT NULL DEFAULT '',
            prize_tier TEXT NOT NULL DEFAULT '',
            prize_amount INTEGER NOT NULL DEFAULT 0,
            owner_email TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tickets_owner ON tickets (owner_email)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tickets_draw_date ON tickets (draw_date_ref)",
        [],
    )?;

    Ok(())
}

const DRAW_COLUMNS: &str = "id, date, prize1, first3_a, first3_b, last3_a, last3_b, last2";

const TICKET_COLUMNS: &str = "id, ticket_number, quantity, amount_paid, purchase_date, \
     draw_date_ref, prize_tier, prize_amount, owner_email";

fn draw_from_row(row: &Row) -> Result<DrawRecord> {
    Ok(DrawRecord {
        id: row.get(0)?,
        date: row.get(1)?,
        prize1: row.get(2)?,
        first3_a: row.get(3)?,
        first3_b: row.get(4)?,
        last3_a: row.get(5)?,
        last3_b: row.get(6)?,
        last2: row.get(7)?,
    })
}

fn ticket_from_row(row: &Row) -> Result<Ticket> {
    let tier: String = row.get(6)?;
    let prize_tier = if tier.is_empty() {
        None
    } else {
        Some(
            tier.parse::<PrizeTier>()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, e.into()))?,
        )
    };

    Ok(Ticket {
        id: row.get(0)?,
        ticket_number: row.get(1)?,
        quantity: row.get(2)?,
        amount_paid: row.get(3)?,
        purchase_date: row.get(4)?,
        draw_date_ref: row.get(5)?,
        prize_tier,
        prize_amount: row.get(7)?,
        owner_email: row.get(8)?,
    })
}

fn tier_column(tier: Option<PrizeTier>) -> &'static str {
    tier.map(|t| t.as_str()).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Draw records
// ---------------------------------------------------------------------------

pub fn insert_draw(conn: &Connection, draw: &DrawRecord) -> Result<DrawRecord> {
    conn.execute(
        "INSERT INTO draw_records (date, prize1, first3_a, first3_b, last3_a, last3_b, last2)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            draw.date,
            draw.prize1,
            draw.first3_a,
            draw.first3_b,
            draw.last3_a,
            draw.last3_b,
            draw.last2,
        ],
    )?;

    Ok(DrawRecord {
        id: conn.last_insert_rowid(),
        ..draw.clone()
    })
}

pub fn list_draws(conn: &Connection) -> Result<Vec<DrawRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM draw_records ORDER BY date DESC",
        DRAW_COLUMNS
    ))?;
    let draws = stmt.query_map([], draw_from_row)?;
    draws.collect()
}

pub fn get_draw_by_id(conn: &Connection, id: i64) -> Result<Option<DrawRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM draw_records WHERE id = ?1", DRAW_COLUMNS),
        [id],
        draw_from_row,
    )
    .optional()
}

/// Dates are unique, so at most one row matches.
pub fn get_draw_by_date(conn: &Connection, date: &str) -> Result<Option<DrawRecord>> {
    conn.query_row(
        &format!("SELECT {} FROM draw_records WHERE date = ?1", DRAW_COLUMNS),
        [date],
        draw_from_row,
    )
    .optional()
}

pub fn get_latest_draw(conn: &Connection) -> Result<Option<DrawRecord>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM draw_records ORDER BY date DESC LIMIT 1",
            DRAW_COLUMNS
        ),
        [],
        draw_from_row,
    )
    .optional()
}

/// Returns the number of rows changed (0 when `id` does not exist).
pub fn update_draw(conn: &Connection, id: i64, draw: &DrawRecord) -> Result<usize> {
    conn.execute(
        "UPDATE draw_records
         SET date = ?1, prize1 = ?2, first3_a = ?3, first3_b = ?4,
             last3_a = ?5, last3_b = ?6, last2 = ?7
         WHERE id = ?8",
        params![
            draw.date,
            draw.prize1,
            draw.first3_a,
            draw.first3_b,
            draw.last3_a,
            draw.last3_b,
            draw.last2,
            id,
        ],
    )
}

pub fn delete_draw(conn: &Connection, id: i64) -> Result<usize> {
    conn.execute("DELETE FROM draw_records WHERE id = ?1", [id])
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

pub fn insert_ticket(conn: &Connection, ticket: &Ticket) -> Result<Ticket> {
    conn.execute(
        "INSERT INTO tickets (
            ticket_number, quantity, amount_paid, purchase_date,
            draw_date_ref, prize_tier, prize_amount, owner_email
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            ticket.ticket_number,
            ticket.quantity,
            ticket.amount_paid,
            ticket.purchase_date,
            ticket.draw_date_ref,
            tier_column(ticket.prize_tier),
            ticket.prize_amount,
            ticket.owner_email,
        ],
    )?;

    Ok(Ticket {
        id: conn.last_insert_rowid(),
        ..ticket.clone()
    })
}

pub fn find_tickets_by_owner(conn: &Connection, owner_email: &str) -> Result<Vec<Ticket>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tickets WHERE owner_email = ?1 ORDER BY purchase_date DESC, id DESC",
        TICKET_COLUMNS
    ))?;
    let tickets = stmt.query_map([owner_email], ticket_from_row)?;
    tickets.collect()
}

pub fn find_ticket(conn: &Connection, id: i64, owner_email: &str) -> Result<Option<Ticket>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM tickets WHERE id = ?1 AND owner_email = ?2",
            TICKET_COLUMNS
        ),
        params![id, owner_email],
        ticket_from_row,
    )
    .optional()
}

/// Every ticket referencing `date`, regardless of owner.
pub fn find_tickets_by_date(conn: &Connection, date: &str) -> Result<Vec<Ticket>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tickets WHERE draw_date_ref = ?1 ORDER BY id",
        TICKET_COLUMNS
    ))?;
    let tickets = stmt.query_map([date], ticket_from_row)?;
    tickets.collect()
}

/// Replaces every column of an owned ticket. Returns 0 when the ticket is
/// missing or belongs to someone else.
pub fn update_ticket(conn: &Connection, ticket: &Ticket) -> Result<usize> {
    conn.execute(
        "UPDATE tickets
         SET ticket_number = ?1, quantity = ?2, amount_paid = ?3, purchase_date = ?4,
             draw_date_ref = ?5, prize_tier = ?6, prize_amount = ?7
         WHERE id = ?8 AND owner_email = ?9",
        params![
            ticket.ticket_number,
            ticket.quantity,
            ticket.amount_paid,
            ticket.purchase_date,
            ticket.draw_date_ref,
            tier_column(ticket.prize_tier),
            ticket.prize_amount,
            ticket.id,
            ticket.owner_email,
        ],
    )
}

pub fn update_ticket_prize(
    conn: &Connection,
    id: i64,
    tier: Option<PrizeTier>,
    amount: i64,
) -> Result<usize> {
    conn.execute(
        "UPDATE tickets SET prize_tier = ?1, prize_amount = ?2 WHERE id = ?3",
        params![tier_column(tier), amount, id],
    )
}

pub fn delete_ticket(conn: &Connection, id: i64, owner_email: &str) -> Result<usize> {
    conn.execute(
        "DELETE FROM tickets WHERE id = ?1 AND owner_email = ?2",
        params![id, owner_email],
    )
}

pub fn delete_tickets_by_owner(conn: &Connection, owner_email: &str) -> Result<usize> {
    conn.execute("DELETE FROM tickets WHERE owner_email = ?1", [owner_email])
}

/// Clears cached prize results on all tickets referencing `date`. Returns the
/// number of tickets that reference the date.
pub fn reset_prize_fields_by_date(conn: &Connection, date: &str) -> Result<usize> {
    conn.execute(
        "UPDATE tickets SET prize_tier = '', prize_amount = 0 WHERE draw_date_ref = ?1",
        [date],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn draw(date: &str) -> DrawRecord {
        DrawRecord {
            id: 0,
            date: date.to_string(),
            prize1: "123456".to_string(),
            first3_a: "123".to_string(),
            first3_b: "789".to_string(),
            last3_a: "456".to_string(),
            last3_b: "999".to_string(),
            last2: "56".to_string(),
        }
    }

    fn ticket(owner: &str, number: &str, date_ref: &str, tier: Option<PrizeTier>) -> Ticket {
        Ticket {
            id: 0,
            ticket_number: number.to_string(),
            quantity: 1,
            amount_paid: 80,
            purchase_date: Utc.with_ymd_and_hms(2024, 1, 10, 9, 30, 0).unwrap(),
            draw_date_ref: date_ref.to_string(),
            prize_tier: tier,
            prize_amount: tier.map(|t| t.amount()).unwrap_or(0),
            owner_email: owner.to_string(),
        }
    }

    #[test]
    fn test_draw_crud() {
        let conn = setup();
        let saved = insert_draw(&conn, &draw("2024-01-16")).unwrap();
        assert!(saved.id > 0);

        assert_eq!(get_draw_by_id(&conn, saved.id).unwrap(), Some(saved.clone()));
        assert_eq!(
            get_draw_by_date(&conn, "2024-01-16").unwrap(),
            Some(saved.clone())
        );
        assert_eq!(get_draw_by_date(&conn, "2024-02-01").unwrap(), None);

        let edited = DrawRecord {
            last2: "07".to_string(),
            ..saved.clone()
        };
        assert_eq!(update_draw(&conn, saved.id, &edited).unwrap(), 1);
        assert_eq!(get_draw_by_id(&conn, saved.id).unwrap().unwrap().last2, "07");

        assert_eq!(delete_draw(&conn, saved.id).unwrap(), 1);
        assert_eq!(delete_draw(&conn, saved.id).unwrap(), 0);
        assert!(list_draws(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_draw_date_rejected() {
        let conn = setup();
        insert_draw(&conn, &draw("2024-01-16")).unwrap();
        assert!(insert_draw(&conn, &draw("2024-01-16")).is_err());
    }

    #[test]
    fn test_latest_and_listing_order() {
        let conn = setup();
        insert_draw(&conn, &draw("2024-01-16")).unwrap();
        insert_draw(&conn, &draw("2024-03-01")).unwrap();
        insert_draw(&conn, &draw("2024-02-16")).unwrap();

        let dates: Vec<String> = list_draws(&conn)
            .unwrap()
            .into_iter()
            .map(|d| d.date)
            .collect();
        assert_eq!(dates, ["2024-03-01", "2024-02-16", "2024-01-16"]);
        assert_eq!(get_latest_draw(&conn).unwrap().unwrap().date, "2024-03-01");
    }

    #[test]
    fn test_tickets_scoped_by_owner() {
        let conn = setup();
        let mine = insert_ticket(&conn, &ticket("a@example.com", "111111", "", None)).unwrap();
        insert_ticket(&conn, &ticket("b@example.com", "222222", "", None)).unwrap();

        let listed = find_tickets_by_owner(&conn, "a@example.com").unwrap();
        assert_eq!(listed, vec![mine.clone()]);

        assert!(find_ticket(&conn, mine.id, "b@example.com").unwrap().is_none());
        assert_eq!(delete_ticket(&conn, mine.id, "b@example.com").unwrap(), 0);

        let stolen = Ticket {
            owner_email: "b@example.com".to_string(),
            ..mine.clone()
        };
        assert_eq!(update_ticket(&conn, &stolen).unwrap(), 0);

        assert_eq!(delete_ticket(&conn, mine.id, "a@example.com").unwrap(), 1);
    }

    #[test]
    fn test_ticket_prize_columns_round_trip() {
        let conn = setup();
        let saved = insert_ticket(
            &conn,
            &ticket("a@example.com", "123456", "2024-01-16", Some(PrizeTier::Prize1)),
        )
        .unwrap();
        let loaded = find_ticket(&conn, saved.id, "a@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(loaded, saved);

        assert_eq!(
            update_ticket_prize(&conn, saved.id, Some(PrizeTier::Lose), 0).unwrap(),
            1
        );
        let loaded = find_ticket(&conn, saved.id, "a@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.prize_tier, Some(PrizeTier::Lose));
        assert_eq!(loaded.prize_amount, 0);
    }

    #[test]
    fn test_reset_by_date_ignores_other_dates_and_owners() {
        let conn = setup();
        let a = insert_ticket(
            &conn,
            &ticket("a@example.com", "123456", "2024-01-16", Some(PrizeTier::Prize1)),
        )
        .unwrap();
        let b = insert_ticket(
            &conn,
            &ticket("b@example.com", "111156", "2024-01-16", Some(PrizeTier::Last2)),
        )
        .unwrap();
        let c = insert_ticket(
            &conn,
            &ticket("a@example.com", "111456", "2024-02-16", Some(PrizeTier::Last3)),
        )
        .unwrap();

        assert_eq!(reset_prize_fields_by_date(&conn, "2024-01-16").unwrap(), 2);

        let a = find_ticket(&conn, a.id, "a@example.com").unwrap().unwrap();
        let b = find_ticket(&conn, b.id, "b@example.com").unwrap().unwrap();
        let c_after = find_ticket(&conn, c.id, "a@example.com").unwrap().unwrap();
        assert_eq!((a.prize_tier, a.prize_amount), (None, 0));
        assert_eq!((b.prize_tier, b.prize_amount), (None, 0));
        assert_eq!(a.draw_date_ref, "2024-01-16");
        assert_eq!(c_after, c);
    }

    #[test]
    fn test_delete_tickets_by_owner() {
        let conn = setup();
        insert_ticket(&conn, &ticket("a@example.com", "111111", "", None)).unwrap();
        insert_ticket(&conn, &ticket("a@example.com", "222222", "", None)).unwrap();
        insert_ticket(&conn, &ticket("b@example.com", "333333", "", None)).unwrap();

        assert_eq!(delete_tickets_by_owner(&conn, "a@example.com").unwrap(), 2);
        assert!(find_tickets_by_owner(&conn, "a@example.com").unwrap().is_empty());
        assert_eq!(find_tickets_by_owner(&conn, "b@example.com").unwrap().len(), 1);
    }
}
