use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum length of the free-text show columns.
pub const TEXT_MAX_LEN: usize = 120;
/// `NUMERIC(10, 2)`
pub const PRICE_MAX_DIGITS: u32 = 10;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// A scheduled screening with its price and seat inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: i64,
    pub movie_title: String,
    pub room: String,
    pub price: Decimal,
    pub available_seats: i32,
}

/// Writable columns of a show, used for both inserts and updates.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowInput {
    pub movie_title: String,
    pub room: String,
    pub price: Decimal,
    pub available_seats: i32,
}

impl ShowInput {
    pub fn into_show(self, id: i64) -> Show {
        Show {
            id,
            movie_title: self.movie_title,
            room: self.room,
            price: self.price,
            available_seats: self.available_seats,
        }
    }
}

impl From<&Show> for ShowInput {
    fn from(show: &Show) -> Self {
        Self {
            movie_title: show.movie_title.clone(),
            room: show.room.clone(),
            price: show.price,
            available_seats: show.available_seats,
        }
    }
}

/// Scales a price to exactly two decimal places so it renders as `"12.50"`.
pub fn normalize_price(mut price: Decimal) -> Decimal {
    price.rescale(PRICE_DECIMAL_PLACES);
    price
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn normalized_price_keeps_two_places() {
        let price = normalize_price(Decimal::from_str("12.5").unwrap());
        assert_eq!(price.to_string(), "12.50");

        let whole = normalize_price(Decimal::from(7));
        assert_eq!(whole.to_string(), "7.00");
    }

    #[test]
    fn show_serializes_price_as_string() {
        let show = ShowInput {
            movie_title: "Dune".into(),
            room: "A1".into(),
            price: normalize_price(Decimal::from_str("12.50").unwrap()),
            available_seats: 100,
        }
        .into_show(1);

        let value = serde_json::to_value(&show).unwrap();
        assert_eq!(value["price"], "12.50");
        assert_eq!(value["available_seats"], 100);
    }
}
