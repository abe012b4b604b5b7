use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::{TempDir, tempdir};
use tokio::fs;

use sidetag_core::config::{Settings, TagConfig};
use sidetag_core::engine::{EditTagRequested, NotificationKind, TagEngine, TagsChanged};
use sidetag_core::event::Listener;
use sidetag_core::geo::DEFAULT_OLC_LOCATION;
use sidetag_core::index::{MemoryIndex, SearchIndex};
use sidetag_core::library::{MemoryTagLibrary, TagLibrary};
use sidetag_core::opened_files::MemoryOpenedFiles;
use sidetag_core::platform::{EntryProperties, LocalPlatform, Platform};
use sidetag_core::storage::{
    Error, FileSystemEntryMeta, LocalBackend, MetadataBackend, Result, SidecarStore,
};
use sidetag_core::tag::{COLLECTED_TAGS_GROUP_ID, Functionality, Tag, TagGroup};

/// Local filesystem platform that counts renames and can be told to reject them.
#[derive(Debug, Default)]
struct FlakyPlatform {
    renames: AtomicUsize,
    reject_renames: AtomicBool,
}

#[async_trait]
impl Platform for FlakyPlatform {
    async fn properties(&self, path: &Path) -> Result<EntryProperties> {
        LocalPlatform.properties(path).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if self.reject_renames.load(Ordering::SeqCst) {
            return Err(Error::AlreadyExists(to.to_path_buf()));
        }
        self.renames.fetch_add(1, Ordering::SeqCst);
        LocalPlatform.rename(from, to).await
    }
}

/// Local backend whose writes can be made to fail.
#[derive(Debug, Default)]
struct FlakyBackend {
    reject_writes: AtomicBool,
}

#[async_trait]
impl MetadataBackend for FlakyBackend {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        LocalBackend.read(path).await
    }

    async fn write(&self, path: &Path, content: &[u8]) -> Result<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        LocalBackend.write(path, content).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        LocalBackend.rename(from, to).await
    }
}

struct Harness {
    _dir: TempDir,
    root: PathBuf,
    engine: TagEngine,
    platform: Arc<FlakyPlatform>,
    backend: Arc<FlakyBackend>,
    index: Arc<MemoryIndex>,
    opened: Arc<MemoryOpenedFiles>,
    library: Arc<MemoryTagLibrary>,
    notifications: Arc<Mutex<Vec<NotificationKind>>>,
    _listener: Listener<sidetag_core::engine::Notification>,
}

impl Harness {
    fn new(config: TagConfig) -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let platform = Arc::new(FlakyPlatform::default());
        let backend = Arc::new(FlakyBackend::default());
        let index = Arc::new(MemoryIndex::new());
        let opened = Arc::new(MemoryOpenedFiles::new());
        let library = Arc::new(MemoryTagLibrary::default());

        let engine = TagEngine::new(
            platform.clone(),
            SidecarStore::new(backend.clone()),
            opened.clone(),
            index.clone(),
            library.clone(),
            config,
        );

        let notifications = Arc::new(Mutex::new(Vec::new()));
        let sink = notifications.clone();
        let listener = Listener::new(&engine.on.notification, move |n| {
            sink.lock().unwrap().push(n.kind);
        });

        Harness {
            _dir: dir,
            root,
            engine,
            platform,
            backend,
            index,
            opened,
            library,
            notifications,
            _listener: listener,
        }
    }

    fn filename_policy() -> Self {
        Self::new(TagConfig::default())
    }

    fn sidecar_policy() -> Self {
        Self::new(TagConfig {
            persist_tags_in_sidecar_file: true,
            ..Default::default()
        })
    }

    async fn file(&self, name: &str) -> PathBuf {
        let path = self.root.join(name);
        fs::write(&path, "content").await.unwrap();
        path
    }

    async fn sidecar(&self, path: &Path, titles: &[&str]) {
        let mut meta = FileSystemEntryMeta::with_tags(titles.iter().map(|t| Tag::new(*t)).collect());
        self.engine.store().save(path, path.is_file(), &mut meta).await.unwrap();
    }

    async fn sidecar_titles(&self, path: &Path) -> Option<Vec<String>> {
        let meta = self.engine.store().load(path, path.is_file()).await.unwrap()?;
        Some(meta.tags.into_iter().map(|t| t.title).collect())
    }

    fn renames(&self) -> usize {
        self.platform.renames.load(Ordering::SeqCst)
    }

    fn notifications(&self) -> Vec<NotificationKind> {
        self.notifications.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn add_encodes_tag_into_file_name() {
    let h = Harness::filename_policy();
    let path = h.file("report.txt").await;

    assert!(h.engine.add_tags_to_entry(&path, &[Tag::new("done")]).await);

    let tagged = h.root.join("report[done].txt");
    assert!(tagged.exists());
    assert!(!path.exists());
    assert_eq!(h.renames(), 1);
    assert!(h.sidecar_titles(&tagged).await.is_none());
}

#[tokio::test]
async fn adding_the_same_tag_twice_is_a_no_op() {
    let h = Harness::filename_policy();
    let path = h.file("report.txt").await;

    assert!(h.engine.add_tags_to_entry(&path, &[Tag::new("done")]).await);
    let tagged = h.root.join("report[done].txt");
    assert!(!h.engine.add_tags_to_entry(&tagged, &[Tag::new("done")]).await);

    assert!(tagged.exists());
    assert_eq!(h.renames(), 1);
}

#[tokio::test]
async fn filename_policy_skips_titles_already_in_the_sidecar() {
    let h = Harness::filename_policy();
    let path = h.file("report.txt").await;
    h.sidecar(&path, &["x"]).await;

    assert!(h.engine.add_tags_to_entry(&path, &[Tag::new("x"), Tag::new("y")]).await);

    let tagged = h.root.join("report[y].txt");
    assert!(tagged.exists());
    // The sidecar record moved along with the file
    assert_eq!(h.sidecar_titles(&tagged).await.unwrap(), vec!["x"]);
}

#[tokio::test]
async fn sidecar_duplicate_is_not_written() {
    let h = Harness::sidecar_policy();
    let path = h.file("report.txt").await;
    h.sidecar(&path, &["x"]).await;
    let before = h.engine.store().load(&path, true).await.unwrap().unwrap();

    assert!(!h.engine.add_tags_to_entry(&path, &[Tag::new("x")]).await);

    let after = h.engine.store().load(&path, true).await.unwrap().unwrap();
    assert_eq!(before, after);
    assert!(path.exists());
    assert_eq!(h.renames(), 0);
}

#[tokio::test]
async fn sidecar_add_creates_record_and_propagates() {
    let h = Harness::sidecar_policy();
    let path = h.file("notes.md").await;
    h.index.index_location(&h.root, h.engine.store(), ' ').await.unwrap();
    h.opened.open(&path, vec![]);

    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = changes.clone();
    let _listener = Listener::new(&h.engine.on.tags_changed, move |e: &TagsChanged| {
        sink.lock().unwrap().push(e.tags.len());
    });

    assert!(h.engine.add_tags_to_entry(&path, &[Tag::new("a"), Tag::new("b")]).await);

    assert!(h.root.join(".ts").join("notes.md.json").exists());
    assert_eq!(h.sidecar_titles(&path).await.unwrap(), vec!["a", "b"]);
    let opened = h.opened.get(&path).unwrap();
    assert_eq!(opened.tags.len(), 2);
    assert!(opened.changed);
    assert_eq!(h.index.get(&path).unwrap().tags.len(), 2);
    assert_eq!(*changes.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn directories_always_use_the_sidecar() {
    let h = Harness::filename_policy();
    let dir = h.root.join("project");
    fs::create_dir(&dir).await.unwrap();

    assert!(h.engine.add_tags_to_entry(&dir, &[Tag::new("active")]).await);

    assert!(dir.exists());
    assert!(dir.join(".ts").join("tsm.json").exists());
    assert_eq!(h.sidecar_titles(&dir).await.unwrap(), vec!["active"]);
}

#[tokio::test]
async fn location_override_beats_global_setting() {
    let mut settings = Settings {
        persist_tags_in_sidecar_file: true,
        ..Default::default()
    };
    let h = Harness::filename_policy();
    let mut location = sidetag_core::config::LocationConfig::new("root", &h.root);
    location.persist_tags_in_sidecar_file = Some(false);
    settings.locations.push(location);
    let path = h.file("a.txt").await;
    h.engine.set_config(settings.snapshot_for(&path));

    assert!(h.engine.add_tags_to_entry(&path, &[Tag::new("t")]).await);
    assert!(h.root.join("a[t].txt").exists());
}

#[tokio::test]
async fn failed_sidecar_write_is_reported() {
    let h = Harness::sidecar_policy();
    let path = h.file("a.txt").await;
    h.backend.reject_writes.store(true, Ordering::SeqCst);

    assert!(!h.engine.add_tags_to_entry(&path, &[Tag::new("t")]).await);
    assert_eq!(h.notifications(), vec![NotificationKind::AddingTagsFailed]);
}

#[tokio::test]
async fn unreadable_sidecar_is_not_overwritten() {
    let h = Harness::sidecar_policy();
    let path = h.file("a.txt").await;
    let location = h.root.join(".ts").join("a.txt.json");
    fs::create_dir_all(location.parent().unwrap()).await.unwrap();
    let broken = r#"{"description":"keep me","tags":[{"title":"old"}],}"#;
    fs::write(&location, broken).await.unwrap();

    assert!(!h.engine.add_tags_to_entry(&path, &[Tag::new("new")]).await);

    assert_eq!(fs::read_to_string(&location).await.unwrap(), broken);
    assert_eq!(h.notifications(), vec![NotificationKind::AddingTagsFailed]);
}

#[tokio::test]
async fn add_tags_attempts_every_path() {
    let h = Harness::filename_policy();
    let blocked = h.file("b.txt").await;
    h.file("b[t].txt").await;
    let free = h.file("a.txt").await;

    assert!(h.engine.add_tags(&[blocked.clone(), free], &[Tag::new("t")], true).await);

    assert!(blocked.exists());
    assert!(h.root.join("a[t].txt").exists());
    assert_eq!(h.notifications(), vec![NotificationKind::RenamingFailed]);
}

#[tokio::test]
async fn add_tags_to_many_paths_and_collect_into_library() {
    let h = Harness::filename_policy();
    let a = h.file("a.txt").await;
    let b = h.file("b.txt").await;

    let tags = [Tag::new("project-x"), Tag::new("42"), Tag::with_functionality(Functionality::Today)];
    assert!(h.engine.add_tags(&[a, b], &tags, true).await);

    let today = chrono::Local::now().format("%Y%m%d").to_string();
    for name in ["a", "b"] {
        let tagged = h.root.join(format!("{}[project-x 42 {}].txt", name, today));
        assert!(tagged.exists(), "{} missing", tagged.display());
    }

    let library = h.library.tag_groups().await.unwrap();
    assert_eq!(library.len(), 1);
    assert_eq!(library[0].uuid, COLLECTED_TAGS_GROUP_ID);
    let titles: Vec<_> = library[0].children.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["project-x"]);
}

#[tokio::test]
async fn live_tags_without_capability_are_skipped() {
    let h = Harness::filename_policy();
    let path = h.file("a.txt").await;

    let tags = [Tag::with_functionality(Functionality::GeoTagging)];
    assert!(!h.engine.add_tags(&[path.clone()], &tags, true).await);

    assert!(path.exists());
    assert_eq!(h.notifications(), vec![NotificationKind::FunctionalityUnavailable]);
}

#[tokio::test]
async fn live_tags_request_an_edit_and_are_added_on_confirmation() {
    let h = Harness::new(TagConfig {
        live_tagging_available: true,
        ..Default::default()
    });
    let path = h.file("photo.jpg").await;

    let requests = Arc::new(Mutex::new(Vec::new()));
    let sink = requests.clone();
    let _listener = Listener::new(&h.engine.on.edit_tag_requested, move |e: &EditTagRequested| {
        sink.lock().unwrap().push(e.tag.clone());
        true
    });

    let tags = [Tag::with_functionality(Functionality::GeoTagging)];
    assert!(!h.engine.add_tags(&[path.clone()], &tags, true).await);
    assert!(path.exists());

    let request = requests.lock().unwrap().pop().unwrap();
    assert_eq!(request.title, DEFAULT_OLC_LOCATION);
    assert_eq!(request.path.as_deref(), Some(path.as_path()));

    assert!(h.engine.edit_tag_for_entry(&path, &request, Some("8FVC9G8F+6X")).await);
    assert!(h.root.join("photo[8FVC9G8F+6X].jpg").exists());
}

#[tokio::test]
async fn live_request_follows_the_renamed_entry() {
    let h = Harness::new(TagConfig {
        live_tagging_available: true,
        ..Default::default()
    });
    let path = h.file("photo.jpg").await;

    let requests = Arc::new(Mutex::new(Vec::new()));
    let sink = requests.clone();
    let _listener = Listener::new(&h.engine.on.edit_tag_requested, move |e: &EditTagRequested| {
        sink.lock().unwrap().push(e.tag.clone());
        true
    });

    let tags = [Tag::new("done"), Tag::with_functionality(Functionality::GeoTagging)];
    assert!(h.engine.add_tags(&[path.clone()], &tags, true).await);

    let tagged = h.root.join("photo[done].jpg");
    let request = requests.lock().unwrap().pop().unwrap();
    assert_eq!(request.path.as_deref(), Some(tagged.as_path()));

    assert!(h.engine.edit_tag_for_entry(&tagged, &request, Some("8FVC9G8F+6X")).await);
    assert!(h.root.join("photo[done 8FVC9G8F+6X].jpg").exists());
}

#[tokio::test]
async fn edit_renames_filename_tag() {
    let h = Harness::filename_policy();
    let path = h.file("report[done].txt").await;

    assert!(h.engine.edit_tag_for_entry(&path, &Tag::new("done"), Some("finished")).await);
    assert!(h.root.join("report[finished].txt").exists());
}

#[tokio::test]
async fn edit_without_change_does_not_rename() {
    let h = Harness::filename_policy();
    let path = h.file("report[a b].txt").await;

    assert!(h.engine.edit_tag_for_entry(&path, &Tag::new("a"), None).await);
    assert_eq!(h.renames(), 0);

    assert!(h.engine.edit_tag_for_entry(&path, &Tag::new("a").at_position(1), None).await);
    assert!(h.root.join("report[b a].txt").exists());
}

#[tokio::test]
async fn edit_rejects_blank_title() {
    let h = Harness::filename_policy();
    let path = h.file("report[done].txt").await;

    assert!(!h.engine.edit_tag_for_entry(&path, &Tag::new("done"), Some("  ")).await);

    assert!(path.exists());
    assert_eq!(h.renames(), 0);
    assert_eq!(h.notifications(), vec![NotificationKind::EditingTagFailed]);
}

#[tokio::test]
async fn edit_keeps_titles_unique() {
    let h = Harness::sidecar_policy();
    let path = h.file("a.txt").await;
    h.sidecar(&path, &["one", "two", "three"]).await;

    assert!(h.engine.edit_tag_for_entry(&path, &Tag::new("three"), Some("one")).await);
    assert_eq!(h.sidecar_titles(&path).await.unwrap(), vec!["one", "two"]);

    let file = h.file("b[x y].txt").await;
    assert!(h.engine.edit_tag_for_entry(&file, &Tag::new("y"), Some("x")).await);
    assert!(h.root.join("b[x].txt").exists());
}

#[tokio::test]
async fn edit_reorders_sidecar_tags() {
    let h = Harness::sidecar_policy();
    let path = h.file("a.txt").await;
    h.sidecar(&path, &["one", "two", "three"]).await;

    let tag = Tag::new("three").at_position(0);
    assert!(h.engine.edit_tag_for_entry(&path, &tag, None).await);
    assert_eq!(h.sidecar_titles(&path).await.unwrap(), vec!["three", "one", "two"]);

    // Unknown tags are appended, the position is ignored
    let tag = Tag::new("four").at_position(0);
    assert!(h.engine.edit_tag_for_entry(&path, &tag, None).await);
    assert_eq!(
        h.sidecar_titles(&path).await.unwrap(),
        vec!["three", "one", "two", "four"]
    );
}

#[tokio::test]
async fn edit_creates_missing_sidecar() {
    let h = Harness::sidecar_policy();
    let path = h.file("a.txt").await;

    assert!(h.engine.edit_tag_for_entry(&path, &Tag::new("old"), Some("new")).await);
    assert_eq!(h.sidecar_titles(&path).await.unwrap(), vec!["new"]);
}

#[tokio::test]
async fn removing_an_absent_tag_is_a_no_op() {
    let h = Harness::filename_policy();
    let path = h.file("report[a].txt").await;
    h.sidecar(&path, &["s"]).await;

    assert!(h.engine.remove_tags_from_entry(&path, &[Tag::new("missing")]).await);
    assert!(path.exists());
    assert_eq!(h.sidecar_titles(&path).await.unwrap(), vec!["s"]);
    assert_eq!(h.renames(), 0);

    let bare = h.file("bare.txt").await;
    assert!(h.engine.remove_tags_from_entry(&bare, &[Tag::new("missing")]).await);
}

#[tokio::test]
async fn remove_strips_both_representations() {
    let h = Harness::filename_policy();
    let path = h.file("report[a b].txt").await;
    h.sidecar(&path, &["s", "a"]).await;

    assert!(h.engine.remove_tags_from_entry(&path, &[Tag::new("a")]).await);

    let renamed = h.root.join("report[b].txt");
    assert!(renamed.exists());
    assert_eq!(h.sidecar_titles(&renamed).await.unwrap(), vec!["s"]);
}

#[tokio::test]
async fn remove_without_sidecar_only_touches_the_name() {
    let h = Harness::filename_policy();
    let path = h.file("report[a b].txt").await;

    assert!(h.engine.remove_tags_from_entry(&path, &[Tag::new("b")]).await);
    assert!(h.root.join("report[a].txt").exists());
}

#[tokio::test]
async fn remove_reports_sidecar_failure_after_rename() {
    let h = Harness::filename_policy();
    let path = h.file("report[a].txt").await;
    h.sidecar(&path, &["s", "a"]).await;
    h.backend.reject_writes.store(true, Ordering::SeqCst);

    assert!(!h.engine.remove_tags_from_entry(&path, &[Tag::new("a")]).await);

    let renamed = h.root.join("report.txt");
    assert!(renamed.exists());
    assert_eq!(h.sidecar_titles(&renamed).await.unwrap(), vec!["s", "a"]);
    assert_eq!(h.notifications(), vec![NotificationKind::RemovingSidecarTagsFailed]);
}

#[tokio::test]
async fn remove_tags_stops_at_first_failure() {
    let h = Harness::filename_policy();
    let missing = h.root.join("missing[a].txt");
    let present = h.file("present[a].txt").await;

    assert!(!h.engine.remove_tags(&[missing, present.clone()], &[Tag::new("a")]).await);
    assert!(present.exists());
}

#[tokio::test]
async fn remove_all_tags_clears_name_then_sidecar() {
    let h = Harness::filename_policy();
    let path = h.file("report[a b].txt").await;
    h.sidecar(&path, &["s"]).await;

    assert!(h.engine.remove_all_tags(&[path.clone()]).await);

    let cleared = h.root.join("report.txt");
    assert!(cleared.exists());
    assert_eq!(h.sidecar_titles(&cleared).await.unwrap(), Vec::<String>::new());
}

#[tokio::test]
async fn rejected_rename_skips_the_sidecar_step() {
    let h = Harness::filename_policy();
    let path = h.file("report[a].txt").await;
    h.sidecar(&path, &["s"]).await;
    h.platform.reject_renames.store(true, Ordering::SeqCst);

    assert!(!h.engine.remove_all_tags(&[path.clone()]).await);

    assert!(path.exists());
    assert_eq!(h.sidecar_titles(&path).await.unwrap(), vec!["s"]);
    assert_eq!(h.notifications(), vec![NotificationKind::RenamingFailed]);
}

#[tokio::test]
async fn remove_all_from_metadata_needs_a_record() {
    let h = Harness::filename_policy();
    let path = h.file("a.txt").await;
    assert!(!h.engine.remove_all_tags_from_metadata(&path).await);

    h.sidecar(&path, &["x"]).await;
    assert!(h.engine.remove_all_tags_from_metadata(&path).await);
    assert_eq!(h.sidecar_titles(&path).await.unwrap(), Vec::<String>::new());

    assert!(h.engine.remove_all_tags_from_filename(&path).await);
    assert_eq!(h.renames(), 0);
}

#[tokio::test]
async fn rename_never_overwrites() {
    let h = Harness::filename_policy();
    let path = h.file("a.txt").await;
    h.file("a[t].txt").await;

    assert!(!h.engine.add_tags_to_entry(&path, &[Tag::new("t")]).await);
    assert!(path.exists());
    assert_eq!(h.notifications(), vec![NotificationKind::RenamingFailed]);
}

#[tokio::test]
async fn collecting_requires_an_index() {
    let h = Harness::filename_policy();
    let group = TagGroup::collected(None, None, vec![]);
    assert!(!h.engine.collect_tags_from_location(&group).await);
    assert_eq!(h.notifications(), vec![NotificationKind::IndexLocationFirst]);

    h.file("a[42 10~20 31UBT9169107473 project-x].txt").await;
    h.index.index_location(&h.root, h.engine.store(), ' ').await.unwrap();
    assert!(!h.index.is_empty());

    assert!(h.engine.collect_tags_from_location(&group).await);
    let library = h.library.tag_groups().await.unwrap();
    let titles: Vec<_> = library[0].children.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["project-x"]);

    // A second run merges into the same group
    assert!(h.engine.collect_tags_from_location(&library[0]).await);
    assert_eq!(h.library.tag_groups().await.unwrap().len(), 1);
}
