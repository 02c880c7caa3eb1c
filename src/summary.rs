use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::types::{PrizeTier, Ticket};

/// Months of spending reported, ending with the current one.
pub const SPENDING_MONTHS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySpending {
    /// `YYYY-MM`
    pub month: String,
    pub spent: i64,
}

/// Totals over one owner's collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub total_tickets: i64,
    pub total_spent: i64,
    pub total_wins: usize,
    pub total_prize: i64,
    pub net_profit: i64,
    pub last_winning_number: Option<String>,
    pub win_percent: f64,
    pub lose_percent: f64,
    pub monthly_spending: Vec<MonthlySpending>,
}

fn is_win(tier: Option<PrizeTier>) -> bool {
    !matches!(tier, None | Some(PrizeTier::Lose))
}

/// First day of the month `back` months before `today`'s month.
fn month_start(today: NaiveDate, back: u32) -> Option<NaiveDate> {
    let months = today.year() * 12 + today.month0() as i32 - back as i32;
    NaiveDate::from_ymd_opt(months.div_euclid(12), months.rem_euclid(12) as u32 + 1, 1)
}

/// Aggregates a collection. Win and lose percentages only count evaluated
/// tickets; spending is bucketed by purchase month for the last
/// [`SPENDING_MONTHS`] months up to `today`.
pub fn summarize(tickets: &[Ticket], today: NaiveDate) -> CollectionSummary {
    let mut monthly_spending: Vec<MonthlySpending> = (0..SPENDING_MONTHS)
        .rev()
        .filter_map(|back| month_start(today, back))
        .map(|start| MonthlySpending {
            month: start.format("%Y-%m").to_string(),
            spent: 0,
        })
        .collect();

    let mut total_tickets = 0;
    let mut total_spent = 0;
    let mut total_prize = 0;
    let mut wins = 0;
    let mut losses = 0;
    let mut last_win: Option<&Ticket> = None;

    for ticket in tickets {
        let spent = ticket.quantity * ticket.amount_paid;
        total_tickets += ticket.quantity;
        total_spent += spent;

        let month = ticket.purchase_date.format("%Y-%m").to_string();
        if let Some(bucket) = monthly_spending.iter_mut().find(|m| m.month == month) {
            bucket.spent += spent;
        }

        if is_win(ticket.prize_tier) {
            wins += 1;
            total_prize += ticket.prize_amount * ticket.quantity;
            if last_win.is_none_or(|w| ticket.purchase_date > w.purchase_date) {
                last_win = Some(ticket);
            }
        } else if ticket.prize_tier == Some(PrizeTier::Lose) {
            losses += 1;
        }
    }

    let evaluated = (wins + losses) as f64;
    let percent = |count: usize| {
        if evaluated > 0.0 {
            count as f64 / evaluated * 100.0
        } else {
            0.0
        }
    };

    CollectionSummary {
        total_tickets,
        total_spent,
        total_wins: wins,
        total_prize,
        net_profit: total_prize - total_spent,
        last_winning_number: last_win.map(|t| t.ticket_number.clone()),
        win_percent: percent(wins),
        lose_percent: percent(losses),
        monthly_spending,
    }
}
