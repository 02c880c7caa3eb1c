use chrono::{Datelike, NaiveDate};

use crate::types::{DrawRecord, PrizeTier};

const THAI_MONTHS: [&str; 12] = [
    "มกราคม",
    "กุมภาพันธ์",
    "มีนาคม",
    "เมษายน",
    "พฤษภาคม",
    "มิถุนายน",
    "กรกฎาคม",
    "สิงหาคม",
    "กันยายน",
    "ตุลาคม",
    "พฤศจิกายน",
    "ธันวาคม",
];

/// Buddhist era is the Gregorian year plus 543.
const BUDDHIST_ERA_OFFSET: i32 = 543;

pub fn parse_draw_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// `2024-01-16` -> `16 มกราคม 2567`. Unparseable input is returned as is.
pub fn format_thai_date(date: &str) -> String {
    match parse_draw_date(date) {
        Some(d) => format!(
            "{} {} {}",
            d.day(),
            THAI_MONTHS[d.month0() as usize],
            d.year() + BUDDHIST_ERA_OFFSET
        ),
        None => date.to_string(),
    }
}

pub fn tier_display_name(tier: Option<PrizeTier>) -> &'static str {
    match tier {
        Some(PrizeTier::Prize1) => "รางวัลที่ 1",
        Some(PrizeTier::Near1) => "รางวัลข้างเคียงรางวัลที่ 1",
        Some(PrizeTier::First3) => "รางวัลเลขหน้า 3 ตัว",
        Some(PrizeTier::Last3) => "รางวัลเลขท้าย 3 ตัว",
        Some(PrizeTier::Last2) => "รางวัลเลขท้าย 2 ตัว",
        Some(PrizeTier::Lose) | None => "ไม่ถูกรางวัล",
    }
}

/// HTML-formatted chat message for a newly published draw.
pub fn draw_announcement(draw: &DrawRecord) -> String {
    format!(
        "🔔 <b>งวดใหม่ถูกเพิ่มแล้ว!</b>\n\n\
         📅 งวดวันที่ : {}\n\
         🏆 รางวัลที่ 1 : {}\n\
         🎯 สามตัวหน้า : {} , {}\n\
         🎯 สามตัวท้าย : {} , {}\n\
         🎯 สองตัวท้าย : {}",
        format_thai_date(&draw.date),
        draw.prize1,
        draw.first3_a,
        draw.first3_b,
        draw.last3_a,
        draw.last3_b,
        draw.last2
    )
}

pub fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thai_date() {
        assert_eq!(format_thai_date("2024-01-16"), "16 มกราคม 2567");
        assert_eq!(format_thai_date("2025-12-01"), "1 ธันวาคม 2568");
        assert_eq!(format_thai_date("16/01/2024"), "16/01/2024");
    }

    #[test]
    fn test_announcement_lists_every_number() {
        let draw = DrawRecord {
            id: 1,
            date: "2024-01-16".to_string(),
            prize1: "123456".to_string(),
            first3_a: "123".to_string(),
            first3_b: "789".to_string(),
            last3_a: "456".to_string(),
            last3_b: "999".to_string(),
            last2: "56".to_string(),
        };
        let msg = draw_announcement(&draw);
        assert!(msg.contains("16 มกราคม 2567"));
        assert!(msg.contains("123456"));
        assert!(msg.contains("123 , 789"));
        assert!(msg.contains("456 , 999"));
        assert!(msg.ends_with("56"));
    }

    #[test]
    fn test_is_digits() {
        assert!(is_digits("012345", 6));
        assert!(!is_digits("01234", 6));
        assert!(!is_digits("01a345", 6));
    }
}
