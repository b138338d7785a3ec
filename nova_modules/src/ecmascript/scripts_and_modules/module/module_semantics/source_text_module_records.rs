// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ### [16.2.1.7 Source Text Module Records](https://tc39.es/ecma262/#sec-source-text-module-records)

use ahash::AHashSet;
use tracing::trace;

use crate::ecmascript::{
    execution::{Agent, HostHooks},
    scripts_and_modules::module::ModuleId,
};

use super::{
    abstract_module_records::{BindingName, ResolveSet, ResolvedBinding},
    cyclic_module_records::{LoadingType, ModuleStatus, get_imported_module},
    evaluation::evaluate_deferred_module,
    module_error::ModuleResult,
};

/// ### ModuleRequest Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequest {
    /// ### \[\[Specifier]]
    pub specifier: String,
    /// Lazy requests are linked but not evaluated together with the
    /// requesting module.
    pub lazy: bool,
}

/// ### ImportEntry Record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntryRecord {
    /// ### \[\[ModuleRequest]]
    pub module_request: String,
    /// ### \[\[ImportName]]
    ///
    /// `None` for namespace imports (`import * as ns from "m"`).
    pub import_name: Option<String>,
    /// ### \[\[LocalName]]
    pub local_name: String,
}

/// ### ExportEntry Record of \[\[LocalExportEntries]]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalExportEntryRecord {
    pub export_name: String,
    pub local_name: String,
}

/// ### ExportEntry Record of \[\[IndirectExportEntries]]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectExportEntryRecord {
    pub export_name: String,
    pub module_request: String,
    /// `None` for `export * as ns from "m"`.
    pub import_name: Option<String>,
}

/// ### ExportEntry Record of \[\[StarExportEntries]]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarExportEntryRecord {
    pub module_request: String,
}

#[derive(Debug, Default, Clone)]
pub struct SourceTextModule {
    /// ### \[\[ImportEntries]]
    pub(crate) import_entries: Vec<ImportEntryRecord>,
    /// ### \[\[LocalExportEntries]]
    pub(crate) local_export_entries: Vec<LocalExportEntryRecord>,
    /// ### \[\[IndirectExportEntries]]
    pub(crate) indirect_export_entries: Vec<IndirectExportEntryRecord>,
    /// ### \[\[StarExportEntries]]
    pub(crate) star_export_entries: Vec<StarExportEntryRecord>,
}

impl SourceTextModule {
    pub fn import_entries(&self) -> &[ImportEntryRecord] {
        &self.import_entries
    }

    pub fn local_export_entries(&self) -> &[LocalExportEntryRecord] {
        &self.local_export_entries
    }

    pub fn indirect_export_entries(&self) -> &[IndirectExportEntryRecord] {
        &self.indirect_export_entries
    }

    pub fn star_export_entries(&self) -> &[StarExportEntryRecord] {
        &self.star_export_entries
    }
}

/// Export names of a native or CommonJS module, published once its body has
/// run.
#[derive(Debug, Default, Clone)]
pub struct DeferredExports {
    published: Option<AHashSet<String>>,
}

impl DeferredExports {
    pub fn is_published(&self) -> bool {
        self.published.is_some()
    }

    /// `None` while the names are unknown.
    pub fn contains(&self, name: &str) -> Option<bool> {
        Some(self.published.as_ref()?.contains(name))
    }

    /// Published names in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.published.iter().flatten().map(String::as_str)
    }

    pub(crate) fn publish(&mut self, names: impl IntoIterator<Item = String>) {
        self.published = Some(names.into_iter().collect());
    }
}

#[derive(Debug, Clone)]
pub struct NativeModule {
    /// Path of the shared library backing the module.
    pub library: String,
    pub(crate) exports: DeferredExports,
}

#[derive(Debug, Clone)]
pub enum ModuleKind {
    EcmaScript(SourceTextModule),
    CommonJs(DeferredExports),
    Native(NativeModule),
    Json,
}

impl ModuleKind {
    pub fn deferred_exports(&self) -> Option<&DeferredExports> {
        match self {
            ModuleKind::CommonJs(exports) => Some(exports),
            ModuleKind::Native(native) => Some(&native.exports),
            ModuleKind::EcmaScript(_) | ModuleKind::Json => None,
        }
    }

    pub(crate) fn deferred_exports_mut(&mut self) -> Option<&mut DeferredExports> {
        match self {
            ModuleKind::CommonJs(exports) => Some(exports),
            ModuleKind::Native(native) => Some(&mut native.exports),
            ModuleKind::EcmaScript(_) | ModuleKind::Json => None,
        }
    }

    pub fn as_source_text(&self) -> Option<&SourceTextModule> {
        match self {
            ModuleKind::EcmaScript(source) => Some(source),
            _ => None,
        }
    }
}

/// Static description of a module handed over by the host when the module
/// is first loaded.
///
/// Import and export declarations can only be added to ECMAScript sources;
/// the declaration builders panic for CommonJS, native and JSON sources.
#[derive(Debug, Clone)]
pub struct ModuleSource {
    pub kind: ModuleKind,
    pub requested_modules: Vec<ModuleRequest>,
    pub has_top_level_await: bool,
    pub loading_type: LoadingType,
    pub shared: bool,
}

impl ModuleSource {
    fn with_kind(kind: ModuleKind) -> Self {
        Self {
            kind,
            requested_modules: vec![],
            has_top_level_await: false,
            loading_type: LoadingType::Stable,
            shared: false,
        }
    }

    pub fn ecmascript() -> Self {
        Self::with_kind(ModuleKind::EcmaScript(SourceTextModule::default()))
    }

    pub fn commonjs() -> Self {
        Self::with_kind(ModuleKind::CommonJs(DeferredExports::default()))
    }

    pub fn native(library: impl Into<String>) -> Self {
        Self::with_kind(ModuleKind::Native(NativeModule {
            library: library.into(),
            exports: DeferredExports::default(),
        }))
    }

    pub fn json() -> Self {
        Self::with_kind(ModuleKind::Json)
    }

    /// Appends `specifier` to the requested modules unless already present.
    fn request(&mut self, specifier: &str) -> &mut ModuleRequest {
        let index = match self
            .requested_modules
            .iter()
            .position(|request| request.specifier == specifier)
        {
            Some(index) => index,
            None => {
                self.requested_modules.push(ModuleRequest {
                    specifier: specifier.to_owned(),
                    lazy: false,
                });
                self.requested_modules.len() - 1
            }
        };
        &mut self.requested_modules[index]
    }

    fn source_text(&mut self) -> &mut SourceTextModule {
        match &mut self.kind {
            ModuleKind::EcmaScript(source) => source,
            kind => panic!("{kind:?} modules have no import or export declarations"),
        }
    }

    /// `import "specifier"`
    pub fn import(mut self, specifier: &str) -> Self {
        self.request(specifier);
        self
    }

    /// A request that is linked but not evaluated with this module.
    pub fn lazy_import(mut self, specifier: &str) -> Self {
        self.request(specifier).lazy = true;
        self
    }

    /// `import { import_name as local_name } from "specifier"`
    ///
    /// ## Panics
    /// If this is not an ECMAScript module source.
    pub fn import_named(mut self, specifier: &str, import_name: &str, local_name: &str) -> Self {
        self.request(specifier);
        self.source_text().import_entries.push(ImportEntryRecord {
            module_request: specifier.to_owned(),
            import_name: Some(import_name.to_owned()),
            local_name: local_name.to_owned(),
        });
        self
    }

    /// `import * as local_name from "specifier"`
    ///
    /// ## Panics
    /// If this is not an ECMAScript module source.
    pub fn import_namespace(mut self, specifier: &str, local_name: &str) -> Self {
        self.request(specifier);
        self.source_text().import_entries.push(ImportEntryRecord {
            module_request: specifier.to_owned(),
            import_name: None,
            local_name: local_name.to_owned(),
        });
        self
    }

    /// `export { local_name as export_name }`
    ///
    /// ## Panics
    /// If this is not an ECMAScript module source.
    pub fn export_local(mut self, export_name: &str, local_name: &str) -> Self {
        self.source_text()
            .local_export_entries
            .push(LocalExportEntryRecord {
                export_name: export_name.to_owned(),
                local_name: local_name.to_owned(),
            });
        self
    }

    /// `export { import_name as export_name } from "specifier"`
    ///
    /// ## Panics
    /// If this is not an ECMAScript module source.
    pub fn export_from(mut self, specifier: &str, import_name: &str, export_name: &str) -> Self {
        self.request(specifier);
        self.source_text()
            .indirect_export_entries
            .push(IndirectExportEntryRecord {
                export_name: export_name.to_owned(),
                module_request: specifier.to_owned(),
                import_name: Some(import_name.to_owned()),
            });
        self
    }

    /// `export * as export_name from "specifier"`
    ///
    /// ## Panics
    /// If this is not an ECMAScript module source.
    pub fn export_namespace_from(mut self, specifier: &str, export_name: &str) -> Self {
        self.request(specifier);
        self.source_text()
            .indirect_export_entries
            .push(IndirectExportEntryRecord {
                export_name: export_name.to_owned(),
                module_request: specifier.to_owned(),
                import_name: None,
            });
        self
    }

    /// `export * from "specifier"`
    ///
    /// ## Panics
    /// If this is not an ECMAScript module source.
    pub fn export_star(mut self, specifier: &str) -> Self {
        self.request(specifier);
        self.source_text()
            .star_export_entries
            .push(StarExportEntryRecord {
                module_request: specifier.to_owned(),
            });
        self
    }

    pub fn with_top_level_await(mut self) -> Self {
        self.has_top_level_await = true;
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.loading_type = LoadingType::Dynamic;
        self
    }

    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }
}

/// ### [16.2.1.7.2.1 GetExportedNames ( \[ exportStarSet \] )](https://tc39.es/ecma262/#sec-getexportednames)
///
/// Lists the names exported by `module`. `export_star_set` guards against
/// star export cycles.
pub fn get_exported_names<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
    export_star_set: &mut Vec<ModuleId>,
) -> ModuleResult<Vec<String>, H::Value> {
    agent.check_module(module)?;
    let (mut exported_names, star_requests) = match &agent[module].kind {
        ModuleKind::EcmaScript(source) => {
            // 2. If exportStarSet contains module, then
            if export_star_set.contains(&module) {
                // a. Assert: We've reached the starting point of an export * circularity.
                // b. Return a new empty List.
                return Ok(vec![]);
            }
            // 3. Append module to exportStarSet.
            export_star_set.push(module);
            // 5. For each ExportEntry Record e of module.[[LocalExportEntries]], do
            // 6. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
            let names: Vec<String> = source
                .local_export_entries
                .iter()
                .map(|e| e.export_name.clone())
                .chain(
                    source
                        .indirect_export_entries
                        .iter()
                        .map(|e| e.export_name.clone()),
                )
                .collect();
            let star_requests: Vec<String> = source
                .star_export_entries
                .iter()
                .map(|e| e.module_request.clone())
                .collect();
            (names, star_requests)
        }
        ModuleKind::CommonJs(exports) | ModuleKind::Native(NativeModule { exports, .. }) => {
            return Ok(exports.names().map(str::to_owned).collect());
        }
        ModuleKind::Json => return Ok(vec!["default".to_owned()]),
    };
    // 7. For each ExportEntry Record e of module.[[StarExportEntries]], do
    for module_request in star_requests {
        // a. Let requestedModule be GetImportedModule(module, e.[[ModuleRequest]]).
        let requested_module = get_imported_module(agent, module, &module_request)?;
        // b. Let starNames be requestedModule.GetExportedNames(exportStarSet).
        let star_names = get_exported_names(agent, requested_module, export_star_set)?;
        // c. For each element n of starNames, do
        for n in star_names {
            // i. If n is not "default", then
            // 1. If exportedNames does not contain n, then
            if n != "default" && !exported_names.contains(&n) {
                // a. Append n to exportedNames.
                exported_names.push(n);
            }
        }
    }
    // 8. Return exportedNames.
    Ok(exported_names)
}

/// ### [16.2.1.7.2.2 ResolveExport ( exportName \[ , resolveSet \] )](https://tc39.es/ecma262/#sec-resolveexport)
///
/// Resolves `export_name` to the binding that ultimately provides it.
/// Returns `None` if the name cannot be resolved and
/// [`ResolvedBinding::Ambiguous`] if star exports provide it from several
/// places. Neither is an error at this level; an `Err` only comes from the
/// host failing to resolve a module request.
///
/// Native and CommonJS modules resolve every name eagerly to a deferred
/// binding whose existence is checked after they execute.
pub fn resolve_export<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
    export_name: &str,
    resolve_set: &mut ResolveSet,
) -> ModuleResult<Option<ResolvedBinding>, H::Value> {
    agent.check_module(module)?;
    match &agent[module].kind {
        ModuleKind::EcmaScript(_) => {}
        ModuleKind::CommonJs(_) | ModuleKind::Native(_) => {
            return Ok(Some(ResolvedBinding::Resolved {
                module,
                binding_name: BindingName::Deferred(export_name.to_owned()),
            }));
        }
        ModuleKind::Json => {
            return Ok((export_name == "default").then(|| ResolvedBinding::Resolved {
                module,
                binding_name: BindingName::Local("default".to_owned()),
            }));
        }
    }

    // 2. For each Record { [[Module]], [[ExportName]] } r of resolveSet, do
    // a. If module and r.[[Module]] are the same Module Record and exportName
    //    is r.[[ExportName]], then
    // 3. Append the Record { [[Module]]: module, [[ExportName]]: exportName } to resolveSet.
    if !resolve_set.insert(module, export_name) {
        // i. Assert: This is a circular import request.
        // ii. Return null.
        trace!(target: "nova_modules::resolve", %module, export_name, "circular export request");
        return Ok(None);
    }

    let ModuleKind::EcmaScript(source) = &agent[module].kind else {
        unreachable!()
    };
    // 4. For each ExportEntry Record e of module.[[LocalExportEntries]], do
    // a. If exportName is e.[[ExportName]], then
    if let Some(e) = source
        .local_export_entries
        .iter()
        .find(|e| e.export_name == export_name)
    {
        // i. Assert: module provides the direct binding for this export.
        // ii. Return ResolvedBinding Record { [[Module]]: module, [[BindingName]]: e.[[LocalName]] }.
        return Ok(Some(ResolvedBinding::Resolved {
            module,
            binding_name: BindingName::Local(e.local_name.clone()),
        }));
    }
    let indirect_export = source
        .indirect_export_entries
        .iter()
        .find(|e| e.export_name == export_name)
        .cloned();
    let star_requests: Vec<String> = source
        .star_export_entries
        .iter()
        .map(|e| e.module_request.clone())
        .collect();

    // 5. For each ExportEntry Record e of module.[[IndirectExportEntries]], do
    // a. If exportName is e.[[ExportName]], then
    if let Some(e) = indirect_export {
        // i. Let importedModule be GetImportedModule(module, e.[[ModuleRequest]]).
        let imported_module = get_imported_module(agent, module, &e.module_request)?;
        return match e.import_name {
            // ii. If e.[[ImportName]] is all, then
            None => {
                // 1. Assert: module does not provide the direct binding for this export.
                // 2. Return ResolvedBinding Record { [[Module]]: importedModule, [[BindingName]]: namespace }.
                Ok(Some(ResolvedBinding::Resolved {
                    module: imported_module,
                    binding_name: BindingName::Namespace,
                }))
            }
            // iii. Else,
            Some(import_name) => {
                // 1. Assert: module imports a specific binding for this export.
                // 2. Return importedModule.ResolveExport(e.[[ImportName]], resolveSet).
                resolve_export(agent, imported_module, &import_name, resolve_set)
            }
        };
    }

    // 6. If exportName is "default", then
    if export_name == "default" {
        // a. Assert: A default export was not explicitly defined by this module.
        // b. Return null.
        // c. NOTE: A default export cannot be provided by an export * from "mod" declaration.
        return Ok(None);
    }

    // 7. Let starResolution be null.
    let mut star_resolution: Option<ResolvedBinding> = None;
    // 8. For each ExportEntry Record e of module.[[StarExportEntries]], do
    for module_request in star_requests {
        // a. Let importedModule be GetImportedModule(module, e.[[ModuleRequest]]).
        let imported_module = get_imported_module(agent, module, &module_request)?;
        // b. Let resolution be ? importedModule.ResolveExport(exportName, resolveSet).
        let resolution = if agent[imported_module].kind.deferred_exports().is_some() {
            resolve_deferred_star_export(agent, imported_module, export_name)?
        } else {
            resolve_export(agent, imported_module, export_name, resolve_set)?
        };
        match resolution {
            // c. If resolution is ambiguous, return ambiguous.
            Some(ResolvedBinding::Ambiguous) => return Ok(Some(ResolvedBinding::Ambiguous)),
            // d. If resolution is not null, then
            Some(resolution) => match &star_resolution {
                // i. Assert: resolution is a ResolvedBinding Record.
                // ii. If starResolution is null, then
                None => {
                    // 1. Set starResolution to resolution.
                    star_resolution = Some(resolution);
                }
                // iii. Else,
                Some(existing) => {
                    // 1. Assert: There is more than one * import that includes the requested name.
                    // 2. If resolution.[[Module]] and starResolution.[[Module]] are not the same
                    //    Module Record, return ambiguous.
                    // 3. If resolution.[[BindingName]] is not starResolution.[[BindingName]],
                    //    return ambiguous.
                    if *existing != resolution {
                        return Ok(Some(ResolvedBinding::Ambiguous));
                    }
                }
            },
            None => {}
        }
    }
    // 9. Return starResolution.
    Ok(star_resolution)
}

/// Star exports of native and CommonJS modules can only be resolved once
/// their export names are known, so the module is executed first.
fn resolve_deferred_star_export<H: HostHooks>(
    agent: &mut Agent<H>,
    module: ModuleId,
    export_name: &str,
) -> ModuleResult<Option<ResolvedBinding>, H::Value> {
    if agent[module].status < ModuleStatus::Evaluated && evaluate_deferred_module(agent, module).is_err() {
        return Ok(None);
    }
    if agent[module].evaluation_error.is_some() {
        return Ok(None);
    }
    let exports = agent[module].kind.deferred_exports();
    let provided = exports.and_then(|exports| exports.contains(export_name));
    Ok((provided != Some(false)).then(|| ResolvedBinding::Resolved {
        module,
        binding_name: BindingName::Deferred(export_name.to_owned()),
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_host::{TestHost, agent_with};

    #[test]
    #[should_panic(expected = "have no import or export declarations")]
    fn declarations_on_json_sources_panic() {
        let _ = ModuleSource::json().export_local("default", "default");
    }

    #[test]
    fn requests_on_commonjs_sources_are_allowed() {
        let source = ModuleSource::commonjs().import("fs").lazy_import("path");
        assert_eq!(source.requested_modules.len(), 2);
        assert!(source.requested_modules[1].lazy);
    }

    #[test]
    fn builder_collects_requests_in_order() {
        let source = ModuleSource::ecmascript()
            .import_named("b", "x", "x")
            .export_star("c")
            .import_namespace("b", "ns")
            .lazy_import("d");
        let specifiers: Vec<_> = source
            .requested_modules
            .iter()
            .map(|r| (r.specifier.as_str(), r.lazy))
            .collect();
        assert_eq!(specifiers, [("b", false), ("c", false), ("d", true)]);
    }

    #[test]
    fn resolves_local_and_indirect_exports() {
        let (mut agent, modules) = agent_with(&[
            ("a", ModuleSource::ecmascript().export_from("b", "x", "y")),
            ("b", ModuleSource::ecmascript().export_local("x", "localX")),
        ]);
        let resolution = resolve_export(&mut agent, modules["a"], "y", &mut ResolveSet::new());
        assert_eq!(
            resolution.ok().flatten(),
            Some(ResolvedBinding::Resolved {
                module: modules["b"],
                binding_name: BindingName::Local("localX".into()),
            })
        );
    }

    #[test]
    fn circular_indirect_exports_resolve_to_null() {
        let (mut agent, modules) = agent_with(&[
            ("a", ModuleSource::ecmascript().export_from("b", "x", "x")),
            ("b", ModuleSource::ecmascript().export_from("a", "x", "x")),
        ]);
        let resolution = resolve_export(&mut agent, modules["a"], "x", &mut ResolveSet::new());
        assert_eq!(resolution.ok(), Some(None));
    }

    #[test]
    fn star_exports_with_different_bindings_are_ambiguous() {
        let (mut agent, modules) = agent_with(&[
            (
                "x",
                ModuleSource::ecmascript().export_star("y").export_star("z"),
            ),
            ("y", ModuleSource::ecmascript().export_local("foo", "foo")),
            ("z", ModuleSource::ecmascript().export_local("foo", "foo")),
        ]);
        let resolution = resolve_export(&mut agent, modules["x"], "foo", &mut ResolveSet::new());
        assert_eq!(resolution.ok().flatten(), Some(ResolvedBinding::Ambiguous));
    }

    #[test]
    fn star_exports_of_the_same_binding_are_not_ambiguous() {
        let (mut agent, modules) = agent_with(&[
            (
                "x",
                ModuleSource::ecmascript().export_star("y").export_star("z"),
            ),
            ("y", ModuleSource::ecmascript().export_from("w", "foo", "foo")),
            ("z", ModuleSource::ecmascript().export_star("w")),
            ("w", ModuleSource::ecmascript().export_local("foo", "f")),
        ]);
        let resolution = resolve_export(&mut agent, modules["x"], "foo", &mut ResolveSet::new());
        assert_eq!(
            resolution.ok().flatten(),
            Some(ResolvedBinding::Resolved {
                module: modules["w"],
                binding_name: BindingName::Local("f".into()),
            })
        );
    }

    #[test]
    fn default_is_never_star_exported() {
        let (mut agent, modules) = agent_with(&[
            ("x", ModuleSource::ecmascript().export_star("y")),
            (
                "y",
                ModuleSource::ecmascript()
                    .export_local("default", "*default*")
                    .export_local("a", "a"),
            ),
        ]);
        let resolution = resolve_export(&mut agent, modules["x"], "default", &mut ResolveSet::new());
        assert_eq!(resolution.ok(), Some(None));
        let names = get_exported_names(&mut agent, modules["x"], &mut vec![]);
        assert_eq!(names.ok(), Some(vec!["a".to_owned()]));
    }

    #[test]
    fn exported_names_survive_star_cycles() {
        let (mut agent, modules) = agent_with(&[
            (
                "a",
                ModuleSource::ecmascript()
                    .export_local("a", "a")
                    .export_star("b"),
            ),
            (
                "b",
                ModuleSource::ecmascript()
                    .export_local("b", "b")
                    .export_star("a"),
            ),
        ]);
        let names = get_exported_names(&mut agent, modules["a"], &mut vec![]);
        assert_eq!(names.ok(), Some(vec!["a".to_owned(), "b".to_owned()]));
    }

    #[test]
    fn commonjs_exports_resolve_eagerly() {
        let (mut agent, modules) = agent_with(&[("cjs", ModuleSource::commonjs())]);
        let resolution = resolve_export(&mut agent, modules["cjs"], "anything", &mut ResolveSet::new());
        assert_eq!(
            resolution.ok().flatten(),
            Some(ResolvedBinding::Resolved {
                module: modules["cjs"],
                binding_name: BindingName::Deferred("anything".into()),
            })
        );
    }

    #[test]
    fn star_export_of_native_module_uses_published_names() {
        let host = TestHost::default();
        host.publish_exports("native", &["open"]);
        let (mut agent, modules) = TestHost::agent(
            host,
            &[
                ("x", ModuleSource::ecmascript().export_star("native")),
                ("native", ModuleSource::native("libfs.so")),
            ],
        );
        let open = resolve_export(&mut agent, modules["x"], "open", &mut ResolveSet::new());
        assert_eq!(
            open.ok().flatten(),
            Some(ResolvedBinding::Resolved {
                module: modules["native"],
                binding_name: BindingName::Deferred("open".into()),
            })
        );
        let close = resolve_export(&mut agent, modules["x"], "close", &mut ResolveSet::new());
        assert_eq!(close.ok(), Some(None));
        assert_eq!(agent.host_hooks().executed(), ["native"]);
    }

    #[test]
    fn unknown_request_is_a_host_error() {
        let (mut agent, modules) = agent_with(&[("a", ModuleSource::ecmascript().export_star("missing"))]);
        let resolution = resolve_export(&mut agent, modules["a"], "x", &mut ResolveSet::new());
        assert!(matches!(
            resolution,
            Err(crate::ModuleError::Host(_))
        ));
    }
}
