// Integration tests for the functions scripts can call on the host

mod common;

use std::rc::Rc;

use common::{write_script, CollectingReporter, SharedOutput};
use jsharness_host::{DefaultResolver, ResourceBundle, Session, Warning};
use tempfile::TempDir;

fn session_in(dir: &TempDir, bundle: ResourceBundle) -> (Session, Rc<CollectingReporter>, SharedOutput) {
    let reporter = Rc::new(CollectingReporter::default());
    let output = SharedOutput::default();
    let session = Session::builder()
        .resolver(DefaultResolver::new(bundle).with_working_dir(dir.path()))
        .reporter(reporter.clone())
        .stdout(output.clone())
        .build()
        .expect("Failed to build session");
    (session, reporter, output)
}

#[test]
fn test_print_joins_string_forms_with_spaces() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (session, _, output) = session_in(&dir, ResourceBundle::new());

    session.load_source_for_test("print(1, 'a', true);");
    assert_eq!(output.contents(), "1 a true\n");

    session.load_source_for_test("print(); print(null, undefined, [1, 2], 2.5);");
    assert_eq!(output.contents(), "1 a true\n\nnull undefined 1,2 2.5\n");
}

#[test]
fn test_warn_forwards_to_reporter() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (session, reporter, _) = session_in(&dir, ResourceBundle::new());

    session.load_source_for_test("warn('deprecated option', 12, 'build.js', 4.9);");

    assert_eq!(
        reporter.warnings.borrow().as_slice(),
        [Warning {
            message: "deprecated option".to_string(),
            source_name: None,
            line: 12,
            line_source: Some("build.js".to_string()),
            column: 4,
        }]
    );
    assert!(reporter.errors.borrow().is_empty());
}

#[test]
fn test_read_file_prefers_filesystem_over_bundle() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_script(dir.path(), "lib.js", "var origin = 'disk';");
    let bundle = ResourceBundle::new().with_entry("/lib.js", &b"var origin = 'bundle';"[..]);
    let (session, reporter, _) = session_in(&dir, bundle);

    session.load_source_for_test("var text = readFile('lib.js'); load('lib.js');");

    assert_eq!(
        session.eval::<String>("text").expect("evaluates"),
        "var origin = 'disk';"
    );
    assert_eq!(session.eval::<String>("origin").expect("evaluates"), "disk");
    assert!(reporter.errors.borrow().is_empty());
}

#[test]
fn test_read_file_falls_back_to_normalized_resource() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let bundle = ResourceBundle::new().with_entry("/templates/banner.txt", &b"hello"[..]);
    let (session, _, _) = session_in(&dir, bundle);

    assert_eq!(
        session
            .eval::<String>("readFile('./templates/banner.txt') + readFile('/templates/banner.txt')")
            .expect("evaluates"),
        "hellohello"
    );
}

#[test]
fn test_read_file_failure_is_catchable() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (session, reporter, _) = session_in(&dir, ResourceBundle::new());

    let caught = session
        .eval::<String>(
            "var caught; try { readFile('missing.txt'); caught = 'no'; } \
             catch (e) { caught = e.name + '|' + e.message; } caught",
        )
        .expect("evaluates");

    assert_eq!(
        caught,
        "HostError|wrap: Couldn't open resource \"/missing.txt\"."
    );
    assert!(reporter.errors.borrow().is_empty());
}

#[test]
fn test_uncaught_read_file_failure_is_a_native_failure() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (session, reporter, _) = session_in(&dir, ResourceBundle::new());

    session.load_source_for_test("readFile('missing.txt'); var unreachable = true;");

    assert_eq!(reporter.error_kinds(), ["native"]);
    assert!(reporter.error_texts()[0].starts_with("HostError: wrap: Couldn't open resource"));
    assert!(session.eval::<bool>("typeof unreachable === 'undefined'").expect("evaluates"));
}

#[test]
fn test_read_file_rejects_invalid_utf8() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00]).expect("Failed to write file");
    let (session, _, _) = session_in(&dir, ResourceBundle::new());

    assert!(session
        .eval::<bool>("try { readFile('blob.bin'); false } catch (e) { e.name === 'HostError' }")
        .expect("evaluates"));
}

#[test]
fn test_load_continues_past_failed_paths() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_script(dir.path(), "broken.js", "var = ;");
    write_script(dir.path(), "ok.js", "var loaded = (typeof loaded === 'number' ? loaded : 0) + 1;");
    let (session, reporter, _) = session_in(&dir, ResourceBundle::new());

    session.load_source_for_test("load('missing.js', 'broken.js', 'ok.js'); var after = loaded;");

    assert_eq!(reporter.error_kinds(), ["open", "syntax"]);
    assert_eq!(session.eval::<i32>("after").expect("evaluates"), 1);
}

#[test]
fn test_nested_load_reaches_the_same_scope() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_script(dir.path(), "outer.js", "var depth = 1; load('inner/inner.js');");
    write_script(dir.path(), "inner/inner.js", "depth = depth + 1; var innerSaw = typeof print;");
    let (session, reporter, _) = session_in(&dir, ResourceBundle::new());

    session.load("outer.js");

    assert_eq!(session.eval::<i32>("depth").expect("evaluates"), 2);
    assert_eq!(session.eval::<String>("innerSaw").expect("evaluates"), "function");
    assert!(reporter.errors.borrow().is_empty());
}

#[test]
fn test_get_resource_as_stream_hands_over_a_readable_handle() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let bundle = ResourceBundle::new().with_entry("/data/lines.txt", &b"one\r\ntwo\nthree"[..]);
    let (session, _, _) = session_in(&dir, bundle);

    let result = session
        .eval::<Vec<String>>(
            "var s = getResourceAsStream('data/lines.txt'); \
             var first = s.readLine(); var second = s.readLine(); var rest = s.readAll(); \
             var atEnd = s.readLine(); s.close(); s.close(); \
             [s.name, first, second, rest, String(atEnd)]",
        )
        .expect("evaluates");

    assert_eq!(result, ["/data/lines.txt", "one", "two", "three", "null"]);
    assert!(session
        .eval::<bool>("try { s.readAll(); false } catch (e) { e.name === 'HostError' }")
        .expect("evaluates"));
}

#[test]
fn test_get_resource_as_stream_returns_null_when_missing() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (session, reporter, _) = session_in(&dir, ResourceBundle::new());

    assert!(session
        .eval::<bool>("getResourceAsStream('nowhere.txt') === null")
        .expect("evaluates"));
    assert!(reporter.errors.borrow().is_empty());
}

#[test]
fn test_host_functions_can_be_shadowed_by_scripts() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (session, _, output) = session_in(&dir, ResourceBundle::new());

    session.load_source_for_test("var hostPrint = print; print = function () {}; print('hidden'); hostPrint('shown');");
    assert_eq!(output.contents(), "shown\n");
}

trait LoadSourceForTest {
    fn load_source_for_test(&self, source: &str);
}

impl LoadSourceForTest for Session {
    /// Run a snippet as if it were a loaded script, so failures are reported.
    fn load_source_for_test(&self, source: &str) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = write_script(dir.path(), "snippet.js", source);
        self.include(&path);
    }
}
