//! Layout and selection helpers for the dashboard.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::fields::CategoryFilter;

/// A rectangle of `percent_x` by `percent_y` centred in `r`.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// Step through `all` followed by each observed label, wrapping.
pub fn next_category(current: &CategoryFilter, categories: &[String]) -> CategoryFilter {
    match current {
        CategoryFilter::All => categories
            .first()
            .map(|c| CategoryFilter::Label(c.clone()))
            .unwrap_or(CategoryFilter::All),
        CategoryFilter::Label(label) => {
            let next = categories
                .iter()
                .position(|c| c == label)
                .and_then(|i| categories.get(i + 1));
            match next {
                Some(c) => CategoryFilter::Label(c.clone()),
                None => CategoryFilter::All,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_cycle_visits_every_label_then_all() {
        let cats = vec!["Home".to_string(), "Work".to_string()];
        let a = next_category(&CategoryFilter::All, &cats);
        assert_eq!(a, CategoryFilter::Label("Home".into()));
        let b = next_category(&a, &cats);
        assert_eq!(b, CategoryFilter::Label("Work".into()));
        assert_eq!(next_category(&b, &cats), CategoryFilter::All);
        assert_eq!(next_category(&CategoryFilter::All, &[]), CategoryFilter::All);
    }

    #[test]
    fn centered_rect_stays_inside() {
        let outer = Rect::new(0, 0, 100, 50);
        let inner = centered_rect(50, 20, outer);
        assert!(inner.x >= outer.x && inner.right() <= outer.right());
        assert!(inner.y >= outer.y && inner.bottom() <= outer.bottom());
        assert_eq!(inner.width, 50);
    }
}
