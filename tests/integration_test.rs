use rpanel::{
    builtin_catalog, AppConfig, Collection, ColumnStateStore, ExpansionEngine, FileStore, Filter,
    MockDirectory, Observers, PageRequest, PanelError, PanelEvent, ResponseEnvelope, Side,
    TransferItem, TransferList, TreeSession,
};
use anyhow::{Context, Result};
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn group_session(directory: &MockDirectory) -> TreeSession<rpanel::CollectionSource> {
    let engine = Arc::new(ExpansionEngine::new(directory.source(Collection::UserGroups)));
    TreeSession::new(engine)
}

/// First root of the current forest that has children in the directory.
fn root_with_children(session: &TreeSession<rpanel::CollectionSource>, directory: &MockDirectory) -> Result<String> {
    let groups = directory.records(Collection::UserGroups);
    session
        .forest()
        .roots()
        .iter()
        .map(|node| node.key().to_owned())
        .find(|key| groups.iter().any(|r| r.parent_id.as_deref() == Some(key.as_str())))
        .context("no root group with children")
}

#[tokio::test]
async fn test_search_then_expand_group_tree() -> Result<()> {
    let directory = MockDirectory::new();
    let source = directory.source(Collection::UserGroups);
    let mut session = group_session(&directory);

    session.search(&source, Filter::new(), PageRequest::first(30)).await?;
    assert_eq!(session.total(), 24);
    assert_eq!(session.forest().roots().len(), 24);
    assert!(session.rows().iter().all(|row| row.depth == 0));

    let key = root_with_children(&session, &directory)?;
    let changed = session.expand(&key).await?;
    assert!(changed.contains(&key));
    assert!(session.is_expanded(&key));

    let rows = session.rows();
    let parent_index = rows.iter().position(|row| row.key() == key).context("parent row")?;
    let child = &rows[parent_index + 1];
    assert_eq!(child.depth, 1);
    assert_eq!(child.node.parent_key(), Some(key.as_str()));

    // Collapsing keeps the loaded children; re-expanding does not fetch.
    session.collapse(&key);
    let calls = directory.calls();
    session.expand(&key).await?;
    assert_eq!(directory.calls(), calls);
    Ok(())
}

#[tokio::test]
async fn test_paging_and_filtering_roots() -> Result<()> {
    let directory = MockDirectory::new();
    let source = directory.source(Collection::Users);
    let engine = Arc::new(ExpansionEngine::new(source.clone()));
    let mut session = TreeSession::new(engine);

    session.search(&source, Filter::new(), PageRequest::first(25)).await?;
    assert_eq!(session.total(), 60);
    assert_eq!(session.page().page_count(session.total()), 3);

    session.goto_page(&source, 2).await?;
    assert_eq!(session.forest().roots().len(), 10);
    assert_eq!(session.page().index, 2);

    let mut filter = Filter::new();
    filter.insert("role".into(), "admin".into());
    session.search(&source, filter, PageRequest::first(25)).await?;
    for root in session.forest().roots() {
        assert_eq!(root.attr_text("role").as_deref(), Some("admin"));
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_expansions_share_one_fetch() -> Result<()> {
    let directory = MockDirectory::new().with_latency(Duration::from_millis(50));
    let source = directory.source(Collection::UserGroups);
    let engine = ExpansionEngine::new(source.clone());
    let mut session = TreeSession::new(Arc::new(ExpansionEngine::new(source.clone())));
    session.search(&source, Filter::new(), PageRequest::first(30)).await?;
    let key = root_with_children(&session, &directory)?;
    let forest = session.forest().clone();

    let calls = directory.calls();
    let (first, second) = futures::join!(engine.expand(&forest, &key), engine.expand(&forest, &key));
    assert_eq!(directory.calls(), calls + 1);

    let first = first?;
    let second = second?;
    let first_children = first.find(&key).context("expanded node")?.loaded_children().len();
    let second_children = second.find(&key).context("expanded node")?.loaded_children().len();
    assert_eq!(first_children, second_children);
    assert!(first_children > 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_expansion_can_be_retried() -> Result<()> {
    let directory = MockDirectory::new();
    let source = directory.source(Collection::UserGroups);
    let mut session = group_session(&directory);
    session.search(&source, Filter::new(), PageRequest::first(30)).await?;
    let key = root_with_children(&session, &directory)?;

    directory.fail_next(1);
    match session.expand(&key).await {
        Err(PanelError::Fetch { key: Some(failed), .. }) => assert_eq!(failed, key),
        other => anyhow::bail!("expected a fetch error, got {other:?}"),
    }
    assert!(!session.is_expanded(&key));
    let node = session.forest().find(&key).context("node")?;
    assert!(!node.is_loaded());

    session.expand(&key).await?;
    assert!(session.is_expanded(&key));
    Ok(())
}

#[tokio::test]
async fn test_new_search_supersedes_loaded_children() -> Result<()> {
    let directory = MockDirectory::new();
    let source = directory.source(Collection::UserGroups);
    let mut session = group_session(&directory);
    session.search(&source, Filter::new(), PageRequest::first(30)).await?;
    let key = root_with_children(&session, &directory)?;

    let expansion = session.engine().load_children(session.forest(), &key).await?;
    session.search(&source, Filter::new(), PageRequest::first(30)).await?;

    let result = session.apply_expansion(&expansion);
    assert!(matches!(result, Err(ref e) if e.is_superseded()));
    assert!(!session.is_expanded(&key));
    Ok(())
}

#[tokio::test]
async fn test_stale_search_response_is_dropped() -> Result<()> {
    let directory = MockDirectory::new();
    let source = directory.source(Collection::Roles);
    let mut session = TreeSession::new(Arc::new(ExpansionEngine::new(source.clone())));

    let stale = session.begin_search(Filter::new(), PageRequest::first(2));
    let latest = session.begin_search(Filter::new(), PageRequest::first(4));

    let result = session.finish_search(&stale, Ok(ResponseEnvelope::Bare(Vec::new())));
    assert!(matches!(result, Err(ref e) if e.is_superseded()));
    assert!(session.is_searching());

    let roles = directory.records(Collection::Roles)[..4].to_vec();
    session.finish_search(&latest, Ok(roles.into()))?;
    assert_eq!(session.forest().roots().len(), 4);
    assert!(!session.is_searching());
    Ok(())
}

#[test]
fn test_envelope_shapes_normalize_alike() -> Result<()> {
    let bodies = [
        r#"[{"id": 1}, {"id": 2}]"#,
        r#"{"items": [{"id": 1}, {"id": 2}], "total": 2}"#,
        r#"{"data": [{"id": 1}, {"id": 2}], "total": 2}"#,
        r#"{"data": {"items": [{"id": 1}, {"id": 2}], "total": 2}}"#,
    ];
    for body in bodies {
        let page = ResponseEnvelope::from_json(body)?.normalize();
        let ids: Vec<_> = page.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"], "body: {body}");
        assert_eq!(page.total, 2, "body: {body}");
    }
    assert!(ResponseEnvelope::from_json(r#"{"rows": []}"#).is_err());
    Ok(())
}

#[test]
fn test_column_layout_survives_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let specs = builtin_catalog().page("users").context("users page")?.table.columns.clone();

    {
        let mut store = ColumnStateStore::new(FileStore::new(dir.path()));
        store.register("users", specs.clone());
        let mut state = store.load("users");
        store.resize("users", &mut state, "email", 10_000.0);
        store.set_visible("users", &mut state, "role", false);
    }

    let mut store = ColumnStateStore::new(FileStore::new(dir.path()));
    store.register("users", specs.clone());
    let state = store.load("users");
    assert_eq!(state.width("email"), Some(600.0));
    assert!(!state.is_visible("role"));
    assert!(state.is_visible("username"));

    let defaults = store.reset("users");
    assert!(defaults.is_visible("role"));
    assert!(store.load("users").is_visible("role"));
    Ok(())
}

#[test]
fn test_corrupt_column_file_falls_back_to_defaults() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let specs = builtin_catalog().page("users").context("users page")?.table.columns.clone();
    let mut store = ColumnStateStore::new(FileStore::new(dir.path()));
    store.register("users", specs);

    let path = dir.path().join(format!("{}.json", store.persisted_key("users")));
    fs::write(&path, "{ not json")?;
    let state = store.load("users");
    assert!(state.is_visible("email"));
    assert_eq!(state.width("email"), Some(240.0));

    fs::write(&path, r#"{"version": 99, "columns": {}}"#)?;
    assert_eq!(store.load("users").width("email"), Some(240.0));
    Ok(())
}

#[test]
fn test_config_file_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("pages.json");
    fs::write(&path, builtin_catalog().to_json()?)?;

    let config = AppConfig::load(&path)?;
    let ids: Vec<_> = config.pages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["user_groups", "users", "roles", "workflows"]);

    fs::write(&path, r#"{"pages": []}"#)?;
    assert!(AppConfig::load(&path).is_err());
    assert!(AppConfig::load(dir.path().join("missing.json")).is_err());
    Ok(())
}

#[test]
fn test_member_transfer_from_directory() -> Result<()> {
    let directory = MockDirectory::new();
    let group = directory
        .records(Collection::UserGroups)
        .iter()
        .find(|g| !directory.members_of(&g.id).is_empty())
        .context("group with members")?;
    let members = directory.members_of(&group.id);

    let items = directory
        .records(Collection::Users)
        .iter()
        .map(|u| TransferItem::new(u.id.clone(), u.id.clone()))
        .collect();
    let mut list = TransferList::new(items, &members);
    assert_eq!(list.target_keys().len(), members.len());

    let first = members[0].clone();
    list.toggle_mark(&first);
    let moved = list.move_marked(Side::Source);
    assert_eq!(moved, vec![first.clone()]);
    assert_eq!(list.side_of(&first), Some(Side::Source));
    assert_eq!(list.target_keys().len(), members.len() - 1);
    Ok(())
}

#[test]
fn test_event_observers_unsubscribe() -> Result<()> {
    let observers = Observers::new();
    let seen = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&seen);
    let subscription = observers.subscribe(move |_: &PanelEvent| {
        *counter.lock().unwrap() += 1;
    });

    observers.notify(&PanelEvent::ColumnReset);
    assert!(observers.unsubscribe(subscription));
    observers.notify(&PanelEvent::ColumnReset);

    assert_eq!(*seen.lock().unwrap(), 1);
    assert!(observers.is_empty());
    Ok(())
}
