//! Key gamma levels derived from the per-strike profile.
//!
//! The server computes these too; deriving them locally lets the view fill in levels the
//! server reported as zero (captures taken before a level existed).

use crate::model::{GexSnapshot, StrikeGex};
use rust_decimal::Decimal;

/// Call wall, put wall and flip point of a GEX profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GexLevels {
    pub call_wall: Option<Decimal>,
    pub put_wall: Option<Decimal>,
    pub flip_point: Option<Decimal>,
}

impl GexLevels {
    /// Derive levels from per-strike rows. Rows may be in any order.
    pub fn from_strikes(rows: &[StrikeGex], spot: Decimal) -> Self {
        let mut ascending: Vec<&StrikeGex> = rows.iter().collect();
        ascending.sort_by(|a, b| a.strike.cmp(&b.strike));

        // Ties keep the lower strike
        let call_wall = ascending
            .iter()
            .copied()
            .filter(|row| row.strike > spot)
            .fold(None::<&StrikeGex>, |best, row| match best {
                Some(best) if best.total_gex >= row.total_gex => Some(best),
                _ => Some(row),
            })
            .map(|row| row.strike);

        let put_wall = ascending
            .iter()
            .copied()
            .filter(|row| row.strike < spot)
            .fold(None::<&StrikeGex>, |best, row| match best {
                Some(best) if best.total_gex <= row.total_gex => Some(best),
                _ => Some(row),
            })
            .map(|row| row.strike);

        Self {
            call_wall,
            put_wall,
            flip_point: flip_point(&ascending),
        }
    }

    /// Levels reported by the snapshot, with locally derived values filling any gaps.
    pub fn resolve(snapshot: &GexSnapshot) -> Self {
        let rows: Vec<StrikeGex> = snapshot.strikes().collect();
        let derived = Self::from_strikes(&rows, snapshot.spot_price);

        Self {
            call_wall: snapshot.call_wall().or(derived.call_wall),
            put_wall: snapshot.put_wall().or(derived.put_wall),
            flip_point: snapshot.flip_point().or(derived.flip_point),
        }
    }
}

/// Walk upward from the lowest strike; the first adjacent pair whose total GEX changes sign
/// yields its higher strike. Zero carries no sign.
fn flip_point(ascending: &[&StrikeGex]) -> Option<Decimal> {
    ascending.windows(2).find_map(|pair| {
        let (lower, upper) = (pair[0].total_gex, pair[1].total_gex);
        let crossed = (lower > Decimal::ZERO && upper < Decimal::ZERO)
            || (lower < Decimal::ZERO && upper > Decimal::ZERO);
        crossed.then_some(pair[1].strike)
    })
}

/// Strike closest to the spot price. Ties keep the strike seen first.
pub fn nearest_strike<'a>(
    strikes: impl IntoIterator<Item = &'a Decimal>,
    spot: Decimal,
) -> Option<Decimal> {
    strikes
        .into_iter()
        .fold(None::<Decimal>, |closest, strike| match closest {
            Some(closest) if (closest - spot).abs() <= (*strike - spot).abs() => Some(closest),
            _ => Some(*strike),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(strike: Decimal, total_gex: Decimal) -> StrikeGex {
        StrikeGex {
            strike,
            total_gex,
            ..Default::default()
        }
    }

    #[test]
    fn test_levels_from_strikes() {
        let rows = vec![
            row(dec!(460), dec!(500)),
            row(dec!(440), dec!(-900)),
            row(dec!(455), dec!(2500)),
            row(dec!(445), dec!(-300)),
            row(dec!(450), dec!(100)),
        ];

        let levels = GexLevels::from_strikes(&rows, dec!(448.5));

        assert_eq!(levels.call_wall, Some(dec!(455)));
        assert_eq!(levels.put_wall, Some(dec!(440)));
        // 445 (-300) -> 450 (+100) is the first crossing from the bottom
        assert_eq!(levels.flip_point, Some(dec!(450)));
    }

    #[test]
    fn test_flip_point_ignores_zero() {
        let rows = vec![
            row(dec!(10), dec!(-5)),
            row(dec!(11), dec!(0)),
            row(dec!(12), dec!(7)),
        ];

        assert_eq!(GexLevels::from_strikes(&rows, dec!(11)).flip_point, None);
    }

    #[test]
    fn test_levels_empty() {
        assert_eq!(GexLevels::from_strikes(&[], dec!(100)), GexLevels::default());
    }

    #[test]
    fn test_resolve_prefers_server_levels() {
        let mut snapshot = GexSnapshot {
            call_wall: dec!(470),
            spot_price: dec!(448.5),
            ..Default::default()
        };
        for row in [row(dec!(440), dec!(-900)), row(dec!(455), dec!(2500))] {
            snapshot.gex_per_strike.insert(row.strike, row);
        }

        let levels = GexLevels::resolve(&snapshot);

        assert_eq!(levels.call_wall, Some(dec!(470)));
        assert_eq!(levels.put_wall, Some(dec!(440)));
        assert_eq!(levels.flip_point, Some(dec!(455)));
    }

    #[test]
    fn test_nearest_strike() {
        let strikes = [dec!(460), dec!(455), dec!(450), dec!(445)];

        assert_eq!(nearest_strike(&strikes, dec!(451.9)), Some(dec!(450)));
        assert_eq!(nearest_strike(&strikes, dec!(500)), Some(dec!(460)));
        // Equidistant: first seen wins
        assert_eq!(nearest_strike(&strikes, dec!(452.5)), Some(dec!(455)));
        assert_eq!(nearest_strike(std::iter::empty(), dec!(452.5)), None);
    }
}
