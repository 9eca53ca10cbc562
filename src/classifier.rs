use crate::error::{Error, Result};
use crate::imports::ImportKind;
use crate::resolver::find_local_module;
use lazy_static::lazy_static;
use log::debug;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    /// Top-level module names shipped with the Python standard library.
    /// Mirrors `sys.stdlib_module_names` for a current CPython release.
    static ref STDLIB_MODULES: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for name in [
            "__future__", "abc", "aifc", "argparse", "array", "ast", "asyncio",
            "atexit", "audioop", "base64", "bdb", "binascii", "bisect",
            "builtins", "bz2", "calendar", "cgi", "cgitb", "chunk", "cmath",
            "cmd", "code", "codecs", "codeop", "collections", "colorsys",
            "compileall", "concurrent", "configparser", "contextlib",
            "contextvars", "copy", "copyreg", "cProfile", "crypt", "csv",
            "ctypes", "curses", "dataclasses", "datetime", "dbm", "decimal",
            "difflib", "dis", "doctest", "email", "encodings", "ensurepip",
            "enum", "errno", "faulthandler", "fcntl", "filecmp", "fileinput",
            "fnmatch", "fractions", "ftplib", "functools", "gc", "getopt",
            "getpass", "gettext", "glob", "graphlib", "grp", "gzip",
            "hashlib", "heapq", "hmac", "html", "http", "imaplib", "imghdr",
            "importlib", "inspect", "io", "ipaddress", "itertools", "json",
            "keyword", "linecache", "locale", "logging", "lzma", "mailbox",
            "mailcap", "marshal", "math", "mimetypes", "mmap", "modulefinder",
            "msvcrt", "multiprocessing", "netrc", "nis", "nntplib", "numbers",
            "operator", "optparse", "os", "ossaudiodev", "pathlib", "pdb",
            "pickle", "pickletools", "pipes", "pkgutil", "platform",
            "plistlib", "poplib", "posix", "posixpath", "pprint", "profile",
            "pstats", "pty", "pwd", "py_compile", "pyclbr", "pydoc", "queue",
            "quopri", "random", "re", "readline", "reprlib", "resource",
            "rlcompleter", "runpy", "sched", "secrets", "select", "selectors",
            "shelve", "shlex", "shutil", "signal", "site", "smtplib",
            "sndhdr", "socket", "socketserver", "spwd", "sqlite3", "ssl",
            "stat", "statistics", "string", "stringprep", "struct",
            "subprocess", "sunau", "symtable", "sys", "sysconfig", "syslog",
            "tabnanny", "tarfile", "telnetlib", "tempfile", "termios", "test",
            "textwrap", "threading", "time", "timeit", "tkinter", "token",
            "tokenize", "tomllib", "trace", "traceback", "tracemalloc",
            "tty", "turtle", "turtledemo", "types", "typing", "unicodedata",
            "unittest", "urllib", "uu", "uuid", "venv", "warnings", "wave",
            "weakref", "webbrowser", "winreg", "winsound", "wsgiref",
            "xdrlib", "xml", "xmlrpc", "zipapp", "zipfile", "zipimport",
            "zlib", "zoneinfo",
        ] {
            s.insert(name);
        }
        s
    };
}

/// Strips an ` as `-aliasing suffix from an import name, if present.
fn strip_alias(name: &str) -> &str {
    match name.split_once(" as ") {
        Some((bare, _)) => bare.trim(),
        None => name.trim(),
    }
}

/// Determines whether an import name belongs to the standard library.
///
/// The name is stripped of any ` as ` alias and any dotted submodule path
/// before the membership test, so `sys.platform` and `os.path as p` both
/// resolve to their top-level package.
pub fn is_standard_library(name: &str) -> bool {
    let bare = strip_alias(name);
    let top_level = bare.split('.').next().unwrap_or(bare);
    STDLIB_MODULES.contains(top_level)
}

/// Classifies bare import names as local files, installable packages, or
/// standard-library modules.
///
/// Third-party installability is decided against an explicit list of
/// site-packages/search directories, so the classifier carries no hidden
/// interpreter state and tests can inject their own package trees.
#[derive(Debug, Clone, Default)]
pub struct PackageClassifier {
    /// Directories probed for installed packages, in order.
    search_paths: Vec<PathBuf>,
}

impl PackageClassifier {
    /// Creates a classifier over an explicit set of package directories.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Derives the search paths from the environment: the active virtualenv
    /// (`VIRTUAL_ENV`, both unix and windows layouts) and `PYTHONPATH`.
    pub fn from_env() -> Self {
        let mut search_paths = Vec::new();

        if let Ok(venv) = std::env::var("VIRTUAL_ENV") {
            let venv = PathBuf::from(venv);
            let lib = venv.join("lib");
            if let Ok(entries) = fs::read_dir(&lib) {
                for entry in entries.flatten() {
                    let site = entry.path().join("site-packages");
                    if site.is_dir() {
                        search_paths.push(site);
                    }
                }
            }
            let windows_site = venv.join("Lib").join("site-packages");
            if windows_site.is_dir() {
                search_paths.push(windows_site);
            }
        }

        if let Ok(pythonpath) = std::env::var("PYTHONPATH") {
            for path in std::env::split_paths(&pythonpath) {
                if path.is_dir() {
                    search_paths.push(path);
                }
            }
        }

        debug!("classifier search paths: {:?}", search_paths);
        Self { search_paths }
    }

    /// Determines whether an import name refers to an installable
    /// third-party package.
    ///
    /// The name is stripped of aliasing first; an empty name is an error.
    /// Standard-library names are never installable. Everything else is
    /// installable iff its top-level package resolves in one of the search
    /// paths, as a package directory, a module file, or a recorded
    /// distribution (`.dist-info`/`.egg-info`).
    pub fn is_installable(&self, name: &str) -> Result<bool> {
        let bare = strip_alias(name);
        if bare.is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        if is_standard_library(bare) {
            return Ok(false);
        }

        let top_level = bare.split('.').next().unwrap_or(bare);
        // Distribution metadata normalizes dashes to underscores.
        let dist_prefix = format!("{}-", top_level.to_lowercase().replace('-', "_"));

        for root in &self.search_paths {
            if root.join(format!("{top_level}.py")).is_file() {
                return Ok(true);
            }
            if root.join(top_level).join("__init__.py").is_file() {
                return Ok(true);
            }
            if let Ok(entries) = fs::read_dir(root) {
                for entry in entries.flatten() {
                    let file_name = entry.file_name().to_string_lossy().to_lowercase();
                    if (file_name.ends_with(".dist-info") || file_name.ends_with(".egg-info"))
                        && file_name.starts_with(&dist_prefix)
                    {
                        return Ok(true);
                    }
                }
            }
        }

        Ok(false)
    }

    /// Places one imported name into exactly one of local/pip/system.
    ///
    /// Precedence is local first (a same-named file shadows an installed
    /// package), then installable, then the `system` fallback carrying the
    /// raw name. The fallback makes the no-classification case unreachable;
    /// only an empty name surfaces as a `Classification` error.
    pub fn classify_name(&self, raw: &str, reference_file: &Path) -> Result<ImportKind> {
        let name = strip_alias(raw);
        if name.is_empty() {
            return Err(Error::Classification(raw.to_string()));
        }
        if let Some(path) = find_local_module(name, reference_file) {
            return Ok(ImportKind::Local(path));
        }
        if self.is_installable(name)? {
            return Ok(ImportKind::Pip(name.to_string()));
        }
        Ok(ImportKind::System(raw.trim().to_string()))
    }
}

/// Checks the package index for an installable distribution of `name`.
///
/// This is the stricter, network-backed variant of installability: a
/// blocking GET against PyPI's JSON endpoint. A success status means the
/// package exists; an HTTP error status means it does not; a transport
/// failure is a service error.
pub fn can_import_via_pip(name: &str) -> Result<bool> {
    let url = format!("https://pypi.org/pypi/{name}/json");
    match ureq::get(&url).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(_)) => Ok(false),
        Err(e) => Err(Error::Service(format!("package index lookup failed: {e}"))),
    }
}
