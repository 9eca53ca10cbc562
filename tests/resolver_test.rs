use pylift::resolver::find_local_module;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_sibling_module_resolves() {
    let dir = tempdir().unwrap();
    let demo1 = dir.path().join("demo1.py");
    let demo2 = dir.path().join("demo2.py");
    fs::write(&demo1, "import demo2\n").unwrap();
    fs::write(&demo2, "x = 1\n").unwrap();

    assert_eq!(find_local_module("demo2", &demo1), Some(demo2.clone()));
    assert_eq!(find_local_module("demo1", &demo2), Some(demo1));
}

#[test]
fn test_missing_module_is_none() {
    let dir = tempdir().unwrap();
    let demo1 = dir.path().join("demo1.py");
    fs::write(&demo1, "import nothing_here\n").unwrap();

    assert_eq!(find_local_module("nothing_here", &demo1), None);
}

#[test]
fn test_dotted_name_resolves_leniently_to_the_module_file() {
    // "demo2.blarg" names a symbol inside demo2.py; the file itself is a
    // good enough answer.
    let dir = tempdir().unwrap();
    let demo1 = dir.path().join("demo1.py");
    let demo2 = dir.path().join("demo2.py");
    fs::write(&demo1, "from demo2 import blarg\n").unwrap();
    fs::write(&demo2, "def blarg():\n    pass\n").unwrap();

    assert_eq!(find_local_module("demo2.blarg", &demo1), Some(demo2));
}

#[test]
fn test_package_submodule_resolves() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.py");
    let pkg = dir.path().join("pkg");
    fs::create_dir(&pkg).unwrap();
    fs::write(pkg.join("__init__.py"), "").unwrap();
    let sub = pkg.join("sub.py");
    fs::write(&sub, "y = 2\n").unwrap();
    fs::write(&main, "from pkg import sub\n").unwrap();

    assert_eq!(find_local_module("pkg.sub", &main), Some(sub));

    // The bare package name only resolves through a module file, and there
    // is no pkg.py here.
    assert_eq!(find_local_module("pkg", &main), None);
}

#[test]
fn test_directory_without_init_is_not_a_package() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.py");
    let pkg = dir.path().join("pkg");
    fs::create_dir(&pkg).unwrap();
    fs::write(pkg.join("sub.py"), "y = 2\n").unwrap();
    fs::write(&main, "from pkg import sub\n").unwrap();

    assert_eq!(find_local_module("pkg.sub", &main), None);
}

#[test]
fn test_resolution_retries_in_ancestor_directories() {
    let dir = tempdir().unwrap();
    let shared = dir.path().join("shared.py");
    fs::write(&shared, "z = 3\n").unwrap();

    let nested = dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();
    let deep = nested.join("deep.py");
    fs::write(&deep, "import shared\n").unwrap();

    assert_eq!(find_local_module("shared", &deep), Some(shared));
}

#[test]
fn test_empty_and_degenerate_names_resolve_to_none() {
    let dir = tempdir().unwrap();
    let main = dir.path().join("main.py");
    fs::write(&main, "").unwrap();

    assert_eq!(find_local_module("", &main), None);
    assert_eq!(find_local_module(".", &main), None);
}
