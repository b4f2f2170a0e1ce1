use super::*;

fn recording_observer(
    doc: &mut Document,
    target: NodeId,
    options: ObserveOptions,
) -> Result<(ObserverId, Rc<RefCell<Vec<Vec<MutationRecord>>>>)> {
    let batches = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&batches);
    let id = doc.observe(
        target,
        options,
        Box::new(move |_doc: &mut Document, records: &[MutationRecord], _id| {
            sink.borrow_mut().push(records.to_vec());
            Ok(())
        }),
    )?;
    Ok((id, batches))
}

#[test]
fn records_are_queued_until_flush_and_delivered_as_one_batch() -> Result<()> {
    let mut doc = Document::from_html("<p id='status'>Waiting</p>")?;
    let status = element(&doc, "status");
    let (_id, batches) = recording_observer(&mut doc, status, ObserveOptions::text_subtree())?;

    doc.set_text_content(status, "One")?;
    doc.set_text_content(status, "Two")?;
    assert!(batches.borrow().is_empty());
    assert_eq!(doc.pending_record_count(), 2);

    assert_eq!(doc.flush_mutations()?, 1);
    let batches = batches.borrow();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert!(
        batches[0]
            .iter()
            .all(|record| record.kind == MutationKind::ChildList && record.target == status)
    );
    assert_eq!(batches[0][1].removed_nodes.len(), 1);
    assert_eq!(batches[0][1].added_nodes.len(), 1);
    Ok(())
}

#[test]
fn old_values_are_kept_only_when_requested() -> Result<()> {
    let mut doc = Document::from_html("<div id='job' class='a'>x</div>")?;
    let job = element(&doc, "job");
    let (_plain, plain) =
        recording_observer(&mut doc, job, ObserveOptions::attributes_only(["class"]))?;
    let (_with_old, with_old) = recording_observer(
        &mut doc,
        job,
        ObserveOptions {
            attribute_old_value: true,
            ..ObserveOptions::attributes_only(["class"])
        },
    )?;

    doc.class_add(job, "b")?;
    doc.flush_mutations()?;

    let plain = plain.borrow();
    let with_old = with_old.borrow();
    assert_eq!(plain[0][0].attribute_name.as_deref(), Some("class"));
    assert_eq!(plain[0][0].old_value, None);
    assert_eq!(with_old[0][0].old_value.as_deref(), Some("a"));
    assert_eq!(doc.attr(job, "class").as_deref(), Some("a b"));
    Ok(())
}

#[test]
fn character_data_old_value_is_reported() -> Result<()> {
    let mut doc = Document::from_html("<p id='status'>Waiting</p>")?;
    let status = element(&doc, "status");
    let text = doc.children(status)[0];
    let (_id, batches) = recording_observer(
        &mut doc,
        status,
        ObserveOptions {
            character_data_old_value: true,
            ..ObserveOptions::text_subtree()
        },
    )?;

    doc.set_text_content(text, "Ready")?;
    doc.flush_mutations()?;

    let batches = batches.borrow();
    assert_eq!(batches[0][0].kind, MutationKind::CharacterData);
    assert_eq!(batches[0][0].target, text);
    assert_eq!(batches[0][0].old_value.as_deref(), Some("Waiting"));
    Ok(())
}

#[test]
fn class_list_on_element_without_class_attribute_is_silent_when_nothing_changes() -> Result<()> {
    let mut doc = Document::from_html("<div id='job'>x</div>")?;
    let job = element(&doc, "job");
    let (_id, batches) = recording_observer(&mut doc, job, ObserveOptions::attributes_only(["class"]))?;

    doc.class_remove(job, "missing")?;
    assert_eq!(doc.pending_record_count(), 0);

    doc.class_add(job, "now")?;
    doc.remove_attr(job, "class")?;
    doc.remove_attr(job, "class")?;
    doc.flush_mutations()?;
    assert_eq!(batches.borrow()[0].len(), 2);
    Ok(())
}

#[test]
fn moving_a_node_records_removal_and_insertion() -> Result<()> {
    let mut doc =
        Document::from_html("<ul id='left'><li id='item'>a</li></ul><ul id='right'></ul>")?;
    let left = element(&doc, "left");
    let right = element(&doc, "right");
    let item = element(&doc, "item");
    let options = ObserveOptions {
        child_list: true,
        ..ObserveOptions::default()
    };
    let (_l, left_batches) = recording_observer(&mut doc, left, options.clone())?;
    let (_r, right_batches) = recording_observer(&mut doc, right, options)?;

    doc.append_child(right, item)?;
    doc.flush_mutations()?;

    assert_eq!(left_batches.borrow()[0][0].removed_nodes, vec![item]);
    assert_eq!(right_batches.borrow()[0][0].added_nodes, vec![item]);
    assert_eq!(doc.parent(item), Some(right));
    Ok(())
}

#[test]
fn records_queued_by_a_callback_are_delivered_in_a_later_round() -> Result<()> {
    let mut doc = Document::from_html("<p id='source'>a</p><p id='mirror'>a</p>")?;
    let source = element(&doc, "source");
    let mirror = element(&doc, "mirror");
    doc.observe(
        source,
        ObserveOptions::text_subtree(),
        Box::new(move |doc: &mut Document, _records: &[MutationRecord], _id| {
            let text = doc.text_content(source)?;
            doc.set_text_content(mirror, &text)
        }),
    )?;
    let (fired, on_fire) = fire_counter();
    let config = WatchConfig::parse("b", "text", "changed_to")?;
    let _watcher = ChangeWatcher::create(&mut doc, Some(mirror), config, on_fire)?;

    doc.set_text_content(source, "b")?;
    assert_eq!(doc.flush_mutations()?, 2);

    doc.assert_text("#mirror", "b")?;
    assert_eq!(fired.get(), 1);
    Ok(())
}

#[test]
fn runaway_callback_hits_the_round_limit() -> Result<()> {
    let mut doc = Document::from_html("<p id='loop'>x</p>")?;
    let node = element(&doc, "loop");
    doc.set_mutation_round_limit(5)?;
    let id = doc.observe(
        node,
        ObserveOptions::attributes_only(["data-n"]),
        Box::new(move |doc: &mut Document, _records: &[MutationRecord], _id| {
            doc.set_attr(node, "data-n", "again")
        }),
    )?;

    doc.set_attr(node, "data-n", "start")?;
    match doc.flush_mutations() {
        Err(Error::DomOperation(message)) => {
            assert!(message.contains("5 rounds"), "unexpected message: {message}");
        }
        other => panic!("expected round limit error, got: {other:?}"),
    }

    // Delivery is usable again once the loop is broken.
    assert!(doc.disconnect(id));
    assert_eq!(doc.flush_mutations()?, 0);
    assert!(matches!(
        doc.set_mutation_round_limit(0),
        Err(Error::InvalidConfig(_))
    ));
    Ok(())
}

#[test]
fn nested_flush_from_a_callback_is_a_no_op() -> Result<()> {
    let mut doc = Document::from_html("<p id='status'>x</p>")?;
    let status = element(&doc, "status");
    let nested = Rc::new(Cell::new(None));
    let nested_sink = Rc::clone(&nested);
    doc.observe(
        status,
        ObserveOptions::text_subtree(),
        Box::new(move |doc: &mut Document, _records: &[MutationRecord], _id| {
            nested_sink.set(Some(doc.flush_mutations()?));
            Ok(())
        }),
    )?;

    doc.set_text_content(status, "y")?;
    assert_eq!(doc.flush_mutations()?, 1);
    assert_eq!(nested.get(), Some(0));
    Ok(())
}

#[test]
fn callback_can_disconnect_itself() -> Result<()> {
    let mut doc = Document::from_html("<p id='status'>x</p>")?;
    let status = element(&doc, "status");
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    doc.observe(
        status,
        ObserveOptions::text_subtree(),
        Box::new(move |doc: &mut Document, _records: &[MutationRecord], id| {
            counter.set(counter.get() + 1);
            assert!(doc.disconnect(id));
            Ok(())
        }),
    )?;

    doc.set_text_content(status, "y")?;
    doc.flush_mutations()?;
    doc.set_text_content(status, "z")?;
    doc.flush_mutations()?;
    assert_eq!(calls.get(), 1);
    Ok(())
}

#[test]
fn callback_error_propagates_and_registration_survives() -> Result<()> {
    let mut doc = Document::from_html("<p id='status'>x</p>")?;
    let status = element(&doc, "status");
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    doc.observe(
        status,
        ObserveOptions::text_subtree(),
        Box::new(move |_doc: &mut Document, _records: &[MutationRecord], _id| {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                return Err(Error::DomOperation("callback failed".into()));
            }
            Ok(())
        }),
    )?;

    doc.set_text_content(status, "y")?;
    assert_eq!(
        doc.flush_mutations(),
        Err(Error::DomOperation("callback failed".into()))
    );
    doc.set_text_content(status, "z")?;
    assert_eq!(doc.flush_mutations()?, 1);
    assert_eq!(calls.get(), 2);
    Ok(())
}

#[test]
fn take_records_drains_without_delivery() -> Result<()> {
    let mut doc = Document::from_html("<p id='status'>x</p>")?;
    let status = element(&doc, "status");
    let (id, batches) = recording_observer(&mut doc, status, ObserveOptions::text_subtree())?;

    doc.set_text_content(status, "y")?;
    let taken = doc.take_records(id);
    assert_eq!(taken.len(), 1);
    assert_eq!(doc.flush_mutations()?, 0);
    assert!(batches.borrow().is_empty());
    assert!(doc.take_records(id).is_empty());
    Ok(())
}

#[test]
fn observe_validates_target_and_options() -> Result<()> {
    let mut doc = Document::from_html("<p id='status'>x</p>")?;
    let status = element(&doc, "status");

    let err = doc
        .observe(
            NodeId(404),
            ObserveOptions::text_subtree(),
            Box::new(|_doc: &mut Document, _records: &[MutationRecord], _id| Ok(())),
        )
        .expect_err("unknown node");
    assert!(matches!(err, Error::DomOperation(_)), "got {err:?}");

    let err = doc
        .observe(
            status,
            ObserveOptions::default(),
            Box::new(|_doc: &mut Document, _records: &[MutationRecord], _id| Ok(())),
        )
        .expect_err("empty options");
    assert!(matches!(err, Error::InvalidConfig(_)), "got {err:?}");
    assert!(!doc.disconnect(ObserverId(404)));
    Ok(())
}

#[test]
fn shallow_observer_ignores_descendant_changes() -> Result<()> {
    let mut doc = Document::from_html("<div id='outer'><p id='inner'>x</p></div>")?;
    let outer = element(&doc, "outer");
    let inner = element(&doc, "inner");
    let (_id, batches) = recording_observer(
        &mut doc,
        outer,
        ObserveOptions {
            child_list: true,
            character_data: true,
            ..ObserveOptions::default()
        },
    )?;

    doc.set_text_content(inner, "y")?;
    assert_eq!(doc.flush_mutations()?, 0);
    assert!(batches.borrow().is_empty());

    doc.remove_node(inner)?;
    assert_eq!(doc.flush_mutations()?, 1);
    assert_eq!(batches.borrow()[0][0].removed_nodes, vec![inner]);
    Ok(())
}
