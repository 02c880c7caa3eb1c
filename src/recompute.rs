//! Keeps cached prize results on tickets consistent with the draw records they
//! reference.
//!
//! A ticket's `prize_tier`/`prize_amount` always reflect the evaluator's output
//! against the current draw for `draw_date_ref`, or are cleared when there is
//! no such draw. Three events move that state:
//!
//! * ticket create/update: [`recompute_on_save`]
//! * draw edit: [`recompute_for_date`] for the old and the new date
//! * draw delete: [`delete_draw_with_cascade`], which runs
//!   [`cascade_reset_on_delete`] and the delete in one transaction
//!
//! Creating a draw does not touch tickets already saved against its date; they
//! pick up results when next saved, or when an admin runs `recompute_draw`.

use anyhow::Result;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::database;
use crate::error::not_found;
use crate::prize::evaluate_ticket;
use crate::types::{DrawRecord, PrizeOutcome, PrizeTier, Ticket};

/// Outcome as stored on a ticket: an evaluated miss is persisted as `lose`.
pub fn persisted_outcome(ticket_number: &str, draw: &DrawRecord) -> PrizeOutcome {
    let outcome = evaluate_ticket(ticket_number, draw);
    match outcome.tier {
        Some(_) => outcome,
        None => PrizeOutcome::won(PrizeTier::Lose),
    }
}

/// Fills in prize fields before a ticket is written.
///
/// `lookup` resolves a draw date to its record. A missing draw is a normal
/// state (results not published yet) and a lookup failure only costs the
/// prize computation, so both leave the ticket with cleared prize fields.
pub fn recompute_on_save<F>(mut ticket: Ticket, lookup: F) -> Ticket
where
    F: FnOnce(&str) -> Result<Option<DrawRecord>>,
{
    if ticket.draw_date_ref.is_empty() {
        ticket.clear_prize();
        return ticket;
    }

    match lookup(&ticket.draw_date_ref) {
        Ok(Some(draw)) => {
            let outcome = persisted_outcome(&ticket.ticket_number, &draw);
            ticket.prize_tier = outcome.tier;
            ticket.prize_amount = outcome.amount;
        }
        Ok(None) => {
            debug!(
                "No draw published for {} yet, leaving ticket {} unevaluated",
                ticket.draw_date_ref, ticket.ticket_number
            );
            ticket.clear_prize();
        }
        Err(e) => {
            warn!(
                "Draw lookup for {} failed, saving ticket without prize: {:#}",
                ticket.draw_date_ref, e
            );
            ticket.clear_prize();
        }
    }

    ticket
}

/// Clears prize results on every ticket referencing `draw_date`, for all
/// owners. Safe to repeat.
pub fn cascade_reset_on_delete(conn: &Connection, draw_date: &str) -> Result<usize> {
    let count = database::reset_prize_fields_by_date(conn, draw_date)?;
    Ok(count)
}

/// Deletes a draw and resets its dependent tickets as one unit of work.
/// Tickets are reset first so a failure part-way never leaves a cached prize
/// pointing at a vanished draw.
pub fn delete_draw_with_cascade(conn: &Connection, id: i64) -> Result<(DrawRecord, usize)> {
    let tx = conn.unchecked_transaction()?;

    let draw = database::get_draw_by_id(&tx, id)?
        .ok_or_else(|| not_found(format!("draw record {}", id)))?;

    let reset = cascade_reset_on_delete(&tx, &draw.date)?;
    database::delete_draw(&tx, id)?;
    tx.commit()?;

    info!(
        "🗑️ Deleted draw {} ({}), reset {} ticket(s)",
        draw.id, draw.date, reset
    );
    Ok((draw, reset))
}

/// Re-evaluates every ticket referencing `date` against the draw currently
/// stored for it, clearing them when there is none. Returns the number of
/// tickets touched.
pub fn recompute_for_date(conn: &Connection, date: &str) -> Result<usize> {
    let Some(draw) = database::get_draw_by_date(conn, date)? else {
        return cascade_reset_on_delete(conn, date);
    };

    let tickets = database::find_tickets_by_date(conn, date)?;
    for ticket in &tickets {
        let outcome = persisted_outcome(&ticket.ticket_number, &draw);
        database::update_ticket_prize(conn, ticket.id, outcome.tier, outcome.amount)?;
    }
    Ok(tickets.len())
}
