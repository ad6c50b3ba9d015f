//! C FFI bindings for gd-core
//!
//! This crate provides a C-compatible API so a host editor can list, parse,
//! build and remove generated tables.

use gd_core::{BatchReport, Config, Dispatcher, Host, Manifest, TableKind};
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::ptr;
use tracing::error;

/// `target` passed to the refresh callback: reload generated files
pub const GD_REFRESH_ASSETS: u32 = 0;
/// `target` passed to the refresh callback: refresh open table editors
pub const GD_REFRESH_EDITORS: u32 = 1;

/// Called twice after every batch, once per refresh target
pub type RefreshFn = extern "C" fn(user_data: *mut c_void, target: u32);

#[derive(Clone, Copy)]
struct RefreshCallback {
    func: RefreshFn,
    user_data: *mut c_void,
}

impl Host for RefreshCallback {
    fn refresh_assets(&mut self) {
        (self.func)(self.user_data, GD_REFRESH_ASSETS);
    }

    fn refresh_open_editors(&mut self) {
        (self.func)(self.user_data, GD_REFRESH_EDITORS);
    }
}

/// Opaque handle to a loaded configuration and its manifest
pub struct FfiProject {
    config: Config,
    manifest: Manifest,
    refresh: Option<RefreshCallback>,
}

impl FfiProject {
    fn dispatcher(&mut self) -> gd_core::Result<Dispatcher<'_>> {
        let dispatcher = Dispatcher::from_config(&mut self.manifest, &self.config)?;
        Ok(match self.refresh {
            Some(callback) => dispatcher.with_host(callback),
            None => dispatcher,
        })
    }
}

/// Collect an array of C strings, skipping null or non-UTF-8 entries
unsafe fn c_strings(items: *const *const c_char, count: usize) -> Vec<String> {
    if items.is_null() {
        return Vec::new();
    }

    (0..count)
        .filter_map(|i| {
            let ptr = *items.add(i);
            if ptr.is_null() {
                None
            } else {
                CStr::from_ptr(ptr).to_str().ok().map(str::to_string)
            }
        })
        .collect()
}

fn failure_count(outcome: gd_core::Result<BatchReport>, operation: &str) -> i64 {
    match outcome {
        Ok(report) => report.failures.len() as i64,
        Err(e) => {
            error!("{operation} failed: {e}");
            -1
        }
    }
}

fn open_project(config_path: &Path) -> gd_core::Result<FfiProject> {
    let config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        let base = config_path.parent().unwrap_or_else(|| Path::new(""));
        Config::default().resolved_against(base)
    };
    let manifest = Manifest::load(&config.manifest_path)?;

    Ok(FfiProject {
        config,
        manifest,
        refresh: None,
    })
}

/// Open the manifest described by a configuration file
///
/// A missing configuration file means default settings relative to its directory.
///
/// # Safety
/// - `config_path` must be a valid C string
/// - Returns null on error
/// - Free the handle with `gd_manifest_free`
#[no_mangle]
pub unsafe extern "C" fn gd_manifest_open(config_path: *const c_char) -> *mut FfiProject {
    if config_path.is_null() {
        return ptr::null_mut();
    }

    let path = match CStr::from_ptr(config_path).to_str() {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    match open_project(Path::new(path)) {
        Ok(project) => Box::into_raw(Box::new(project)),
        Err(e) => {
            error!("cannot open manifest: {e}");
            ptr::null_mut()
        }
    }
}

/// Free a manifest handle
///
/// # Safety
/// - `project` must be a valid pointer returned by `gd_manifest_open` or null
#[no_mangle]
pub unsafe extern "C" fn gd_manifest_free(project: *mut FfiProject) {
    if !project.is_null() {
        drop(Box::from_raw(project));
    }
}

/// Register a function called after every batch or removal
///
/// The function receives `GD_REFRESH_ASSETS` and then `GD_REFRESH_EDITORS`.
/// Pass a null `func` to stop notifications.
///
/// # Safety
/// - `project` must be a valid pointer returned by `gd_manifest_open`
/// - `user_data` is passed back unchanged and must stay valid while registered
#[no_mangle]
pub unsafe extern "C" fn gd_set_refresh_callback(
    project: *mut FfiProject,
    func: Option<RefreshFn>,
    user_data: *mut c_void,
) {
    if project.is_null() {
        return;
    }
    (*project).refresh = func.map(|func| RefreshCallback { func, user_data });
}

/// Get the number of tables in the manifest
///
/// # Safety
/// - `project` must be a valid pointer returned by `gd_manifest_open`
#[no_mangle]
pub unsafe extern "C" fn gd_manifest_count(project: *const FfiProject) -> usize {
    if project.is_null() {
        return 0;
    }
    (*project).manifest.len()
}

/// Get a manifest entry as JSON (`kind`, `name`, `sourcePath`, `outputPaths`)
///
/// Entries are ordered by table name.
///
/// # Safety
/// - `project` must be a valid pointer returned by `gd_manifest_open`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `gd_free_string`
#[no_mangle]
pub unsafe extern "C" fn gd_manifest_entry_json(project: *const FfiProject, index: usize) -> *mut c_char {
    if project.is_null() {
        return ptr::null_mut();
    }

    (*project)
        .manifest
        .iter()
        .nth(index)
        .and_then(|entry| serde_json::to_string(entry).ok())
        .and_then(|json| CString::new(json).ok())
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Parse every source under the configured directories
///
/// Returns the number of tables that failed, or -1 if the batch could not run.
///
/// # Safety
/// - `project` must be a valid pointer returned by `gd_manifest_open`
#[no_mangle]
pub unsafe extern "C" fn gd_build(project: *mut FfiProject) -> i64 {
    if project.is_null() {
        return -1;
    }
    let project = &mut *project;
    let sources = project.config.sources.clone();

    failure_count(project.dispatcher().and_then(|mut d| d.build(&sources)), "build")
}

/// Parse specific source files as one table kind
///
/// `kind` is `convert`, `enum` or `variable`. Files that are not sources are
/// skipped. Returns the number of tables that failed, or -1 if the batch could
/// not run.
///
/// # Safety
/// - `project` must be a valid pointer returned by `gd_manifest_open`
/// - `paths` must be a valid pointer to an array of `count` C strings
/// - `kind` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn gd_parse_files(
    project: *mut FfiProject,
    paths: *const *const c_char,
    count: usize,
    kind: *const c_char,
) -> i64 {
    if project.is_null() || paths.is_null() || kind.is_null() {
        return -1;
    }

    let kind = match CStr::from_ptr(kind).to_str().map(str::parse::<TableKind>) {
        Ok(Ok(kind)) => kind,
        Ok(Err(e)) => {
            error!("{e}");
            return -1;
        }
        Err(_) => return -1,
    };
    let files: Vec<PathBuf> = c_strings(paths, count).into_iter().map(PathBuf::from).collect();

    failure_count(
        (*project).dispatcher().and_then(|mut d| d.parse_files(&files, kind)),
        "parse",
    )
}

/// Parse manifested tables again from their recorded source and kind
///
/// A null `names` or a zero `count` parses every entry again. Returns the
/// number of tables that failed, or -1 if the batch could not run.
///
/// # Safety
/// - `project` must be a valid pointer returned by `gd_manifest_open`
/// - `names` must be null or a valid pointer to an array of `count` C strings
#[no_mangle]
pub unsafe extern "C" fn gd_reparse(project: *mut FfiProject, names: *const *const c_char, count: usize) -> i64 {
    if project.is_null() {
        return -1;
    }

    let names = c_strings(names, count);
    failure_count(
        (*project).dispatcher().and_then(|mut d| d.reparse(&names)),
        "reparse",
    )
}

/// Remove a table and delete its generated files
///
/// Returns 1 if the table was removed, 0 if it was not in the manifest and -1 on error.
///
/// # Safety
/// - `project` must be a valid pointer returned by `gd_manifest_open`
/// - `name` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn gd_remove(project: *mut FfiProject, name: *const c_char) -> i32 {
    if project.is_null() || name.is_null() {
        return -1;
    }

    let name = match CStr::from_ptr(name).to_str() {
        Ok(s) => s,
        Err(_) => return -1,
    };

    match (*project).dispatcher().and_then(|mut d| d.remove(&[name])) {
        Ok(removed) => i32::from(!removed.is_empty()),
        Err(e) => {
            error!(table = name, "remove failed: {e}");
            -1
        }
    }
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a gd_* function or null
#[no_mangle]
pub unsafe extern "C" fn gd_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
