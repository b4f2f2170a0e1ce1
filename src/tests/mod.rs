use super::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

mod dom_and_selectors;
mod mutation_delivery;

/// Shared fire counter plus a callback that bumps it.
fn fire_counter() -> (Rc<Cell<usize>>, impl FnOnce() + 'static) {
    let fired = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&fired);
    (fired, move || counter.set(counter.get() + 1))
}

fn element(doc: &Document, id: &str) -> NodeId {
    doc.get_element_by_id(id)
        .unwrap_or_else(|| panic!("missing element #{id}"))
}

fn watch(
    doc: &mut Document,
    id: &str,
    match_text: &str,
    property: ObservedProperty,
    direction: TriggerDirection,
) -> Result<(ChangeWatcher, Rc<Cell<usize>>)> {
    let (fired, on_fire) = fire_counter();
    let config = WatchConfig::new(match_text, property, direction)?;
    let target = doc.get_element_by_id(id);
    let watcher = ChangeWatcher::create(doc, target, config, on_fire)?;
    Ok((watcher, fired))
}
