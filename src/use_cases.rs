use anyhow::Result;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::info;

use crate::connection::{Db, lock};
use crate::database::{self, *};
use crate::error::{not_found, validation};
use crate::notify::Notifier;
use crate::prize::evaluate_ticket;
use crate::recompute::{delete_draw_with_cascade, recompute_for_date, recompute_on_save};
use crate::summary::summarize;
use crate::types::{DrawRecord, Ticket, TicketInput};
use crate::utils::{draw_announcement, is_digits, parse_draw_date, tier_display_name};

fn required_str<'a>(arguments: &'a HashMap<String, Value>, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| validation(format!("Missing {} parameter", key)))
}

fn required_id(arguments: &HashMap<String, Value>) -> Result<i64> {
    arguments
        .get("id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| validation("Missing id parameter"))
}

/// Decodes the record fields carried in the tool arguments.
fn decode<T: DeserializeOwned>(arguments: &HashMap<String, Value>) -> Result<T> {
    serde_json::from_value(json!(arguments))
        .map_err(|e| validation(format!("Invalid input data: {}", e)))
}

fn validate_draw(draw: &DrawRecord) -> Result<()> {
    if parse_draw_date(&draw.date).is_none() {
        return Err(validation(format!(
            "date must be YYYY-MM-DD, got {:?}",
            draw.date
        )));
    }

    let fields = [
        ("prize1", &draw.prize1, 6),
        ("first3A", &draw.first3_a, 3),
        ("first3B", &draw.first3_b, 3),
        ("last3A", &draw.last3_a, 3),
        ("last3B", &draw.last3_b, 3),
        ("last2", &draw.last2, 2),
    ];
    for (name, value, len) in fields {
        if !is_digits(value, len) {
            return Err(validation(format!("{} must be {} digits", name, len)));
        }
    }
    Ok(())
}

fn validate_ticket(input: &TicketInput) -> Result<()> {
    if input.ticket_number.is_empty() {
        return Err(validation("Ticket number is required"));
    }
    if !input.ticket_number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(validation("Ticket number must contain only digits"));
    }
    if input.quantity <= 0 {
        return Err(validation("Ticket quantity must be greater than 0"));
    }
    if input.amount_paid <= 0 {
        return Err(validation("Ticket amount must be greater than 0"));
    }
    Ok(())
}

/// Turns a UNIQUE violation on `draw_records.date` into a validation error.
fn duplicate_date(err: rusqlite::Error, date: &str) -> anyhow::Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            validation(format!("A draw for {} already exists", date))
        }
        _ => err.into(),
    }
}

pub struct DrawUseCase {
    db: Db,
    notifier: Notifier,
}

impl DrawUseCase {
    pub fn new(db: Db, notifier: Notifier) -> Self {
        Self { db, notifier }
    }

    pub async fn create_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let draw: DrawRecord = decode(arguments)?;
        validate_draw(&draw)?;

        let saved = {
            let conn = lock(&self.db)?;
            insert_draw(&conn, &draw).map_err(|e| duplicate_date(e, &draw.date))?
        };
        info!("🎰 Draw {} published (id {})", saved.date, saved.id);

        self.notifier.dispatch(draw_announcement(&saved));

        Ok(json!({
            "success": true,
            "draw": saved
        })
        .to_string())
    }

    pub async fn list_draws(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let draws = list_draws(&*lock(&self.db)?)?;

        Ok(json!({
            "success": true,
            "results": draws
        })
        .to_string())
    }

    /// Looks a draw up by `id` when given, otherwise by `date`.
    pub async fn get_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let conn = lock(&self.db)?;
        let draw = match arguments.get("id").and_then(|v| v.as_i64()) {
            Some(id) => get_draw_by_id(&conn, id)?,
            None => get_draw_by_date(&conn, required_str(arguments, "date")?)?,
        };
        let draw = draw.ok_or_else(|| not_found("draw record"))?;

        Ok(json!({
            "success": true,
            "draw": draw
        })
        .to_string())
    }

    pub async fn get_latest_draw(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let draw = get_latest_draw(&*lock(&self.db)?)?;

        Ok(json!({
            "success": true,
            "draw": draw
        })
        .to_string())
    }

    /// Edits a draw and re-evaluates the tickets on both its old and new date
    /// in the same transaction.
    pub async fn update_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let id = required_id(arguments)?;
        let draw: DrawRecord = decode(arguments)?;
        validate_draw(&draw)?;

        let conn = lock(&self.db)?;
        let tx = conn.unchecked_transaction()?;

        let existing =
            get_draw_by_id(&tx, id)?.ok_or_else(|| not_found(format!("draw record {}", id)))?;
        database::update_draw(&tx, id, &draw).map_err(|e| duplicate_date(e, &draw.date))?;

        let mut recomputed = recompute_for_date(&tx, &existing.date)?;
        if existing.date != draw.date {
            recomputed += recompute_for_date(&tx, &draw.date)?;
        }
        tx.commit()?;

        let updated = DrawRecord { id, ..draw };
        info!(
            "✏️ Draw {} updated, {} ticket(s) re-evaluated",
            updated.date, recomputed
        );

        Ok(json!({
            "success": true,
            "draw": updated,
            "tickets_recomputed": recomputed
        })
        .to_string())
    }

    pub async fn delete_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let id = required_id(arguments)?;
        let (deleted, reset) = delete_draw_with_cascade(&*lock(&self.db)?, id)?;

        Ok(json!({
            "success": true,
            "deleted": deleted,
            "tickets_reset": reset
        })
        .to_string())
    }

    pub async fn recompute_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let date = required_str(arguments, "date")?;

        let conn = lock(&self.db)?;
        let tx = conn.unchecked_transaction()?;
        let recomputed = recompute_for_date(&tx, date)?;
        tx.commit()?;
        info!("🔁 Re-evaluated {} ticket(s) for {}", recomputed, date);

        Ok(json!({
            "success": true,
            "date": date,
            "tickets_recomputed": recomputed
        })
        .to_string())
    }

    /// Checks a number against a stored draw without saving anything.
    pub async fn check_ticket(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let ticket_number = required_str(arguments, "ticketNumber")?;
        let date = required_str(arguments, "date")?;

        let draw = get_draw_by_date(&*lock(&self.db)?, date)?
            .ok_or_else(|| not_found(format!("draw for {}", date)))?;
        let outcome = evaluate_ticket(ticket_number, &draw);

        Ok(json!({
            "success": true,
            "ticketNumber": ticket_number,
            "date": date,
            "prize": outcome,
            "display_name": tier_display_name(outcome.tier)
        })
        .to_string())
    }
}

pub struct TicketUseCase {
    db: Db,
}

impl TicketUseCase {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_ticket(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let owner_email = required_str(arguments, "owner_email")?;
        let input: TicketInput = decode(arguments)?;
        validate_ticket(&input)?;

        let ticket = Ticket {
            id: 0,
            ticket_number: input.ticket_number,
            quantity: input.quantity,
            amount_paid: input.amount_paid,
            purchase_date: input.purchase_date.unwrap_or_else(Utc::now),
            draw_date_ref: input.draw_date_ref,
            prize_tier: None,
            prize_amount: 0,
            owner_email: owner_email.to_string(),
        };

        let conn = lock(&self.db)?;
        let ticket = recompute_on_save(ticket, |date| Ok(get_draw_by_date(&conn, date)?));
        let saved = insert_ticket(&conn, &ticket)?;
        info!(
            "🎟️ Ticket {} saved for {} (prize: {})",
            saved.ticket_number,
            saved.owner_email,
            saved.prize_tier.map(|t| t.as_str()).unwrap_or("-")
        );

        Ok(json!({
            "success": true,
            "ticket": saved
        })
        .to_string())
    }

    pub async fn list_tickets(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let owner_email = required_str(arguments, "owner_email")?;
        let tickets = find_tickets_by_owner(&*lock(&self.db)?, owner_email)?;

        Ok(json!({
            "success": true,
            "collection": tickets
        })
        .to_string())
    }

    /// Spending, winnings and net profit over the owner's collection.
    pub async fn collection_summary(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let owner_email = required_str(arguments, "owner_email")?;
        let tickets = find_tickets_by_owner(&*lock(&self.db)?, owner_email)?;
        let summary = summarize(&tickets, Utc::now().date_naive());

        Ok(json!({
            "success": true,
            "summary": summary
        })
        .to_string())
    }

    /// Replaces an owned ticket's fields. An omitted purchase date keeps the
    /// stored one.
    pub async fn update_ticket(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let owner_email = required_str(arguments, "owner_email")?;
        let id = required_id(arguments)?;
        let input: TicketInput = decode(arguments)?;
        validate_ticket(&input)?;

        let conn = lock(&self.db)?;
        let existing = find_ticket(&conn, id, owner_email)?
            .ok_or_else(|| not_found(format!("ticket {}", id)))?;

        let ticket = Ticket {
            ticket_number: input.ticket_number,
            quantity: input.quantity,
            amount_paid: input.amount_paid,
            purchase_date: input.purchase_date.unwrap_or(existing.purchase_date),
            draw_date_ref: input.draw_date_ref,
            ..existing
        };
        let ticket = recompute_on_save(ticket, |date| Ok(get_draw_by_date(&conn, date)?));

        if database::update_ticket(&conn, &ticket)? == 0 {
            return Err(not_found(format!("ticket {}", id)));
        }
        info!("✏️ Ticket {} updated for {}", ticket.id, ticket.owner_email);

        Ok(json!({
            "success": true,
            "ticket": ticket
        })
        .to_string())
    }

    pub async fn delete_ticket(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let owner_email = required_str(arguments, "owner_email")?;
        let id = required_id(arguments)?;

        if database::delete_ticket(&*lock(&self.db)?, id, owner_email)? == 0 {
            return Err(not_found(format!("ticket {}", id)));
        }
        info!("🗑️ Ticket {} deleted for {}", id, owner_email);

        Ok(json!({
            "success": true,
            "message": "Deleted"
        })
        .to_string())
    }

    /// Removes every ticket the owner has, as when their account goes away.
    pub async fn clear_collection(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let owner_email = required_str(arguments, "owner_email")?;
        let removed = delete_tickets_by_owner(&*lock(&self.db)?, owner_email)?;
        info!("🧹 Removed {} ticket(s) for {}", removed, owner_email);

        Ok(json!({
            "success": true,
            "deleted": removed
        })
        .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_validate_ticket_messages() {
        let ok = TicketInput {
            ticket_number: "123456".to_string(),
            quantity: 1,
            amount_paid: 80,
            ..TicketInput::default()
        };
        assert!(validate_ticket(&ok).is_ok());

        let cases = [
            (
                TicketInput {
                    ticket_number: String::new(),
                    ..ok.clone()
                },
                "Ticket number is required",
            ),
            (
                TicketInput {
                    ticket_number: "12 456".to_string(),
                    ..ok.clone()
                },
                "only digits",
            ),
            (
                TicketInput {
                    quantity: 0,
                    ..ok.clone()
                },
                "quantity",
            ),
            (
                TicketInput {
                    amount_paid: -5,
                    ..ok.clone()
                },
                "amount",
            ),
        ];
        for (input, expected) in cases {
            let err = validate_ticket(&input).unwrap_err();
            assert!(err.to_string().contains(expected), "{}", err);
        }
    }

    #[test]
    fn test_validate_draw_rejects_bad_shapes() {
        let good: DrawRecord = decode(&args(json!({
            "date": "2024-01-16",
            "prize1": "123456",
            "first3A": "123",
            "first3B": "789",
            "last3A": "456",
            "last3B": "999",
            "last2": "56"
        })))
        .unwrap();
        assert!(validate_draw(&good).is_ok());

        let bad_date = DrawRecord {
            date: "2024-13-01".to_string(),
            ..good.clone()
        };
        assert!(validate_draw(&bad_date).is_err());

        let short_prize = DrawRecord {
            prize1: "12345".to_string(),
            ..good.clone()
        };
        assert!(validate_draw(&short_prize).is_err());

        let letters = DrawRecord {
            last2: "5a".to_string(),
            ..good
        };
        assert!(validate_draw(&letters).is_err());
    }

    #[test]
    fn test_decode_reports_missing_fields_as_validation() {
        let err = decode::<DrawRecord>(&args(json!({ "date": "2024-01-16" }))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::ServiceError>(),
            Some(crate::error::ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_required_str_rejects_blank() {
        let a = args(json!({ "owner_email": "  " }));
        assert!(required_str(&a, "owner_email").is_err());
        assert!(required_str(&a, "date").is_err());
    }
}
