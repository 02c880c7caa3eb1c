use crate::types::{DrawRecord, PrizeOutcome, PrizeTier};

/// Full-length ticket; the substring tiers only apply at this length.
const TICKET_LEN: usize = 6;

/// Checks a ticket number against a draw, highest tier first. Returns
/// `PrizeOutcome::NONE` when nothing matches; mapping that to `lose` is the
/// caller's business.
pub fn evaluate_ticket(ticket_number: &str, draw: &DrawRecord) -> PrizeOutcome {
    if ticket_number == draw.prize1 {
        return PrizeOutcome::won(PrizeTier::Prize1);
    }

    if is_adjacent(ticket_number, &draw.prize1) {
        return PrizeOutcome::won(PrizeTier::Near1);
    }

    if ticket_number.len() != TICKET_LEN {
        return PrizeOutcome::NONE;
    }

    let front = ticket_number.get(..3);
    if front.is_some_and(|f| f == draw.first3_a || f == draw.first3_b) {
        return PrizeOutcome::won(PrizeTier::First3);
    }

    let back3 = ticket_number.get(3..);
    if back3.is_some_and(|b| b == draw.last3_a || b == draw.last3_b) {
        return PrizeOutcome::won(PrizeTier::Last3);
    }

    if ticket_number.get(4..) == Some(draw.last2.as_str()) {
        return PrizeOutcome::won(PrizeTier::Last2);
    }

    PrizeOutcome::NONE
}

/// Numeric ±1 against the first prize. No wraparound at either end.
fn is_adjacent(ticket_number: &str, prize1: &str) -> bool {
    match (parse_digits(ticket_number), parse_digits(prize1)) {
        (Some(n), Some(p)) => n.abs_diff(p) == 1,
        _ => false,
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
