use pylift::classifier::PackageClassifier;
use pylift::normalizer::Normalizer;
use rustpython_parser::{parse, Mode};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn fake_site_packages(packages: &[&str]) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let site = dir.path().join("site-packages");
    for package in packages {
        fs::create_dir_all(site.join(package)).unwrap();
        fs::write(site.join(package).join("__init__.py"), "").unwrap();
    }
    (dir, site)
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_normalize_inlines_local_imports_into_namespaces() {
    let (_site_dir, site) = fake_site_packages(&["numpy", "pandas"]);
    let dir = tempdir().unwrap();

    write(
        dir.path(),
        "demo3.py",
        "import os\nimport pandas\nbanana = 99\norange = lambda x: x + 2\n",
    );
    write(
        dir.path(),
        "demo2.py",
        "import demo3\n\ndef blarg(lst):\n    return ((lst, lst), demo3.orange(demo3.banana))\n",
    );
    let demo1 = write(
        dir.path(),
        "demo1.py",
        r#"PURPOSE_OF_THIS_FILE = 'just for testing'
from demo2 import blarg as super_duper_important
import platform as banana_mango
from sys import platform
import os
import numpy
a = 44

def arbitrary_test_function(foo):
    print(a)
    return (super_duper_important([foo]), banana_mango.system(), platform(), os.name)
"#,
    );

    let classifier = PackageClassifier::new(vec![site]);
    let normalized = Normalizer::new(&classifier).normalize_file(&demo1).unwrap();

    // The local chain demo1 -> demo2 -> demo3 inlines as nested namespaces.
    assert!(normalized.contains("class demo2:"));
    assert!(normalized.contains("demo2 = demo2()"));
    assert!(normalized.contains("    class demo3:"));
    assert!(normalized.contains("        import pandas"));
    assert!(normalized.contains("    demo3 = demo3()"));

    // The from-import alias is rewritten at its use site and the alias name
    // itself is gone.
    assert!(normalized.contains("demo2.blarg([foo])"));
    assert!(!normalized.contains("super_duper_important"));

    // Pip and system imports survive, aliases included.
    assert!(normalized.contains("import platform as banana_mango"));
    assert!(normalized.contains("banana_mango.system()"));
    assert!(normalized.contains("from sys import platform"));
    assert!(normalized.contains("import numpy"));
    assert!(normalized.contains("import os"));

    // No import of a local file remains anywhere in the output.
    assert!(!normalized.contains("from demo2"));
    assert!(!normalized.contains("import demo3"));

    // Untouched code keeps its original text.
    assert!(normalized.contains("PURPOSE_OF_THIS_FILE = 'just for testing'"));
    assert!(normalized.contains("a = 44"));

    assert!(parse(&normalized, Mode::Module, "<normalized>").is_ok());
}

#[test]
fn test_normalize_handles_function_local_imports() {
    let dir = tempdir().unwrap();
    write(dir.path(), "helper.py", "x = 5\n");
    let main = write(
        dir.path(),
        "main.py",
        "def f():\n    import helper\n    return helper.x\n",
    );

    let classifier = PackageClassifier::new(vec![]);
    let normalized = Normalizer::new(&classifier).normalize_file(&main).unwrap();

    // The inlined namespace lands at the import's indentation level.
    assert!(normalized.contains("    class helper:\n        x = 5"));
    assert!(normalized.contains("    helper = helper()"));
    assert!(normalized.contains("    return helper.x"));
    assert!(parse(&normalized, Mode::Module, "<normalized>").is_ok());
}

#[test]
fn test_normalize_splits_multi_name_imports() {
    let dir = tempdir().unwrap();
    write(dir.path(), "local_one.py", "value = 1\n");
    let main = write(dir.path(), "main.py", "import local_one, sys\n\nprint(local_one.value)\n");

    let classifier = PackageClassifier::new(vec![]);
    let normalized = Normalizer::new(&classifier).normalize_file(&main).unwrap();

    assert!(normalized.contains("class local_one:"));
    assert!(normalized.contains("local_one = local_one()"));
    assert!(normalized.contains("import sys"));
    assert!(normalized.contains("print(local_one.value)"));
    assert!(parse(&normalized, Mode::Module, "<normalized>").is_ok());
}

#[test]
fn test_normalize_rewrites_aliased_plain_local_import() {
    let dir = tempdir().unwrap();
    write(dir.path(), "helper.py", "x = 5\n");
    let main = write(dir.path(), "main.py", "import helper as h\n\nprint(h.x)\n");

    let classifier = PackageClassifier::new(vec![]);
    let normalized = Normalizer::new(&classifier).normalize_file(&main).unwrap();

    assert!(normalized.contains("class helper:"));
    assert!(normalized.contains("print(helper.x)"));
    assert!(!normalized.contains("h.x"));
    assert!(parse(&normalized, Mode::Module, "<normalized>").is_ok());
}

#[test]
fn test_normalize_defuses_circular_imports() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a.py", "import b\nval = 1\n");
    write(dir.path(), "b.py", "import a\n");

    let classifier = PackageClassifier::new(vec![]);
    let normalized = Normalizer::new(&classifier).normalize_file(&a).unwrap();

    // b's import of a hits the recursion path and inlines as an empty
    // namespace instead of recursing forever.
    assert!(normalized.contains("class b:"));
    assert!(normalized.contains("    class a:\n        pass"));
    assert!(normalized.contains("val = 1"));
    assert!(parse(&normalized, Mode::Module, "<normalized>").is_ok());
}

#[test]
fn test_normalize_rewrites_aliases_in_signatures() {
    let dir = tempdir().unwrap();
    write(dir.path(), "helper.py", "x = 5\n");
    let main = write(
        dir.path(),
        "main.py",
        r#"from helper import x as hx

def f(a=hx, b: hx = 2) -> hx:
    return a

g = lambda a=hx: a
"#,
    );

    let classifier = PackageClassifier::new(vec![]);
    let normalized = Normalizer::new(&classifier).normalize_file(&main).unwrap();

    // Defaults, parameter annotations, and return annotations all follow
    // the alias table, not just names in function bodies.
    assert!(normalized.contains("def f(a=helper.x, b: helper.x = 2) -> helper.x:"));
    assert!(normalized.contains("g = lambda a=helper.x: a"));
    assert!(!normalized.contains("hx"));
    assert!(parse(&normalized, Mode::Module, "<normalized>").is_ok());
}

#[test]
fn test_normalize_reaches_match_arms() {
    let dir = tempdir().unwrap();
    write(dir.path(), "helper.py", "x = 5\n");
    let main = write(
        dir.path(),
        "main.py",
        r#"def dispatch(v):
    match v:
        case 1:
            import helper
            return helper.x
        case _:
            return 0
"#,
    );

    let classifier = PackageClassifier::new(vec![]);
    let normalized = Normalizer::new(&classifier).normalize_file(&main).unwrap();

    assert!(normalized.contains("            class helper:"));
    assert!(normalized.contains("            helper = helper()"));
    assert!(!normalized.contains("import helper"));
    assert!(normalized.contains("return helper.x"));
    assert!(parse(&normalized, Mode::Module, "<normalized>").is_ok());
}

#[test]
fn test_normalize_resolves_relative_sibling_imports() {
    let dir = tempdir().unwrap();
    write(dir.path(), "helper.py", "x = 5\n");
    let plain = write(dir.path(), "plain.py", "from . import helper\n\nprint(helper.x)\n");
    let aliased = write(dir.path(), "aliased.py", "from . import helper as h\n\nprint(h.x)\n");

    let classifier = PackageClassifier::new(vec![]);

    let normalized = Normalizer::new(&classifier).normalize_file(&plain).unwrap();
    assert!(normalized.contains("class helper:"));
    assert!(normalized.contains("helper = helper()"));
    assert!(!normalized.contains("from ."));
    assert!(normalized.contains("print(helper.x)"));
    assert!(parse(&normalized, Mode::Module, "<normalized>").is_ok());

    let normalized = Normalizer::new(&classifier).normalize_file(&aliased).unwrap();
    assert!(normalized.contains("class helper:"));
    assert!(normalized.contains("print(helper.x)"));
    assert!(!normalized.contains("h.x"));
    assert!(parse(&normalized, Mode::Module, "<normalized>").is_ok());
}

#[test]
fn test_normalize_namespaces_dotted_import_under_last_component() {
    let dir = tempdir().unwrap();
    let pkg = dir.path().join("pkg");
    fs::create_dir(&pkg).unwrap();
    fs::write(pkg.join("__init__.py"), "").unwrap();
    fs::write(pkg.join("sub.py"), "value = 7\n").unwrap();
    let main = write(dir.path(), "main.py", "import pkg.sub\n\nprint(pkg.sub.value)\n");

    let classifier = PackageClassifier::new(vec![]);
    let normalized = Normalizer::new(&classifier).normalize_file(&main).unwrap();

    // `class pkg.sub:` would not parse; the namespace is the last dotted
    // component, and dotted use sites follow it.
    assert!(normalized.contains("class sub:"));
    assert!(normalized.contains("sub = sub()"));
    assert!(normalized.contains("print(sub.value)"));
    assert!(!normalized.contains("pkg.sub.value"));
    assert!(parse(&normalized, Mode::Module, "<normalized>").is_ok());
}

#[test]
fn test_normalize_is_identity_without_local_imports() {
    let dir = tempdir().unwrap();
    let source = "import os\nimport sys\n\ndef f():\n    return os.name\n";
    let main = write(dir.path(), "main.py", source);

    let classifier = PackageClassifier::new(vec![]);
    let normalized = Normalizer::new(&classifier).normalize_file(&main).unwrap();
    assert_eq!(normalized, source);
}
