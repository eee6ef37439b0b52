//! Redaction overlap warning
//!
//! Advisory only. A text box (inserted or replaced text) that intersects
//! another text box or an opaque rectangle on the same page is flagged, and so
//! is the element it intersects. Flags are recomputed from scratch for the
//! whole page on every change.

use crate::overlay::{ElementContent, ElementId, Overlay, OverlayElement};

fn is_obstacle(content: &ElementContent) -> bool {
    content.is_text_box() || matches!(content, ElementContent::Opaque { .. })
}

/// Whether the pair should be flagged. Symmetric in its arguments.
fn conflicts(a: &OverlayElement, b: &OverlayElement) -> bool {
    if a.id == b.id || a.page != b.page || !a.rect.intersects(&b.rect) {
        return false;
    }
    (a.content.is_text_box() && is_obstacle(&b.content))
        || (b.content.is_text_box() && is_obstacle(&a.content))
}

/// Elements that `id` conflicts with
pub fn overlaps_of(overlay: &Overlay, id: ElementId) -> Vec<ElementId> {
    let Some(subject) = overlay.get(id) else {
        return Vec::new();
    };
    overlay
        .elements_on_page(subject.page)
        .filter(|other| conflicts(subject, other))
        .map(|other| other.id)
        .collect()
}

/// Recompute warning flags for every element on `page`. Returns the flagged
/// elements.
pub fn recompute(overlay: &mut Overlay, page: u32) -> Vec<ElementId> {
    let on_page: Vec<OverlayElement> = overlay.elements_on_page(page).cloned().collect();
    let flagged: Vec<ElementId> = on_page
        .iter()
        .filter(|a| on_page.iter().any(|b| conflicts(a, b)))
        .map(|a| a.id)
        .collect();

    for el in overlay.elements_mut().filter(|e| e.page == page) {
        el.overlap_warning = flagged.contains(&el.id);
    }
    if !flagged.is_empty() {
        tracing::debug!(page, flagged = flagged.len(), "overlap warning");
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PixelRect;
    use pdfedit_ops::TextStyle;

    fn text(overlay: &mut Overlay, page: u32, rect: PixelRect) -> ElementId {
        overlay.create(
            page,
            rect,
            ElementContent::Text {
                text: "x".to_string(),
                style: TextStyle::default(),
            },
        )
    }

    fn opaque(overlay: &mut Overlay, page: u32, rect: PixelRect) -> ElementId {
        overlay.create(
            page,
            rect,
            ElementContent::Opaque {
                color: "#000000".to_string(),
            },
        )
    }

    #[test]
    fn test_text_over_redaction_flags_both() {
        let mut overlay = Overlay::new();
        let t = text(&mut overlay, 1, PixelRect::new(0.0, 0.0, 100.0, 20.0));
        let r = opaque(&mut overlay, 1, PixelRect::new(50.0, 10.0, 100.0, 20.0));
        let flagged = recompute(&mut overlay, 1);
        assert_eq!(flagged, vec![t, r]);
        assert!(overlay.get(t).unwrap().overlap_warning);
        assert!(overlay.get(r).unwrap().overlap_warning);
    }

    #[test]
    fn test_two_redactions_are_not_flagged() {
        let mut overlay = Overlay::new();
        opaque(&mut overlay, 1, PixelRect::new(0.0, 0.0, 100.0, 20.0));
        opaque(&mut overlay, 1, PixelRect::new(50.0, 10.0, 100.0, 20.0));
        assert!(recompute(&mut overlay, 1).is_empty());
    }

    #[test]
    fn test_other_pages_and_kinds_are_ignored() {
        let mut overlay = Overlay::new();
        text(&mut overlay, 1, PixelRect::new(0.0, 0.0, 100.0, 20.0));
        opaque(&mut overlay, 2, PixelRect::new(0.0, 0.0, 100.0, 20.0));
        overlay.create(
            1,
            PixelRect::new(0.0, 0.0, 100.0, 20.0),
            ElementContent::Highlight {
                color: "#FFFF00".to_string(),
                opacity: 0.3,
            },
        );
        assert!(recompute(&mut overlay, 1).is_empty());
    }

    #[test]
    fn test_flags_clear_when_moved_apart() {
        let mut overlay = Overlay::new();
        let t = text(&mut overlay, 1, PixelRect::new(0.0, 0.0, 100.0, 20.0));
        let r = opaque(&mut overlay, 1, PixelRect::new(50.0, 10.0, 100.0, 20.0));
        recompute(&mut overlay, 1);
        overlay.move_to(r, 400.0, 400.0).unwrap();
        recompute(&mut overlay, 1);
        assert!(!overlay.get(t).unwrap().overlap_warning);
        assert!(!overlay.get(r).unwrap().overlap_warning);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::geometry::PixelRect;
    use pdfedit_ops::TextStyle;
    use proptest::prelude::*;

    fn content() -> impl Strategy<Value = ElementContent> {
        prop_oneof![
            Just(ElementContent::Text {
                text: "t".to_string(),
                style: TextStyle::default(),
            }),
            Just(ElementContent::Opaque {
                color: "#000000".to_string(),
            }),
            Just(ElementContent::Checkbox { checked: true }),
        ]
    }

    fn element() -> impl Strategy<Value = (PixelRect, ElementContent)> {
        (0.0f64..300.0, 0.0f64..300.0, 10.0f64..120.0, 10.0f64..120.0, content())
            .prop_map(|(x, y, w, h, c)| (PixelRect::new(x, y, w, h), c))
    }

    proptest! {
        /// Property: A overlaps B exactly when B overlaps A
        #[test]
        fn overlap_is_symmetric(elements in prop::collection::vec(element(), 2..8)) {
            let mut overlay = Overlay::new();
            let ids: Vec<ElementId> = elements
                .into_iter()
                .map(|(rect, content)| overlay.create(1, rect, content))
                .collect();
            recompute(&mut overlay, 1);

            for &a in &ids {
                for b in overlaps_of(&overlay, a) {
                    prop_assert!(overlaps_of(&overlay, b).contains(&a));
                    prop_assert!(overlay.get(a).unwrap().overlap_warning);
                    prop_assert!(overlay.get(b).unwrap().overlap_warning);
                }
                if overlaps_of(&overlay, a).is_empty() {
                    prop_assert!(!overlay.get(a).unwrap().overlap_warning);
                }
            }
        }
    }
}
