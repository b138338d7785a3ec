// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use core::fmt::Debug;

use thiserror::Error;

use crate::ecmascript::{
    execution::{ExceptionType, JsError},
    scripts_and_modules::module::ModuleId,
};

use super::cyclic_module_records::ModuleStatus;

pub type ModuleResult<T, V> = std::result::Result<T, ModuleError<V>>;

/// Why a name failed to resolve to a single binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// ResolveExport returned null.
    NotFound,
    /// ResolveExport returned "ambiguous".
    Ambiguous,
}

impl ResolutionFailure {
    fn reason(self) -> &'static str {
        match self {
            ResolutionFailure::NotFound => "does not provide an export named",
            ResolutionFailure::Ambiguous => "provides an ambiguous export named",
        }
    }
}

#[derive(Debug, Error)]
pub enum ModuleError<V: Debug> {
    #[error(
        "the requested module '{specifier}' {} '{export_name}' which is imported by '{referrer}'",
        .failure.reason()
    )]
    UnresolvedImport {
        specifier: String,
        export_name: String,
        referrer: String,
        failure: ResolutionFailure,
    },
    #[error(
        "the requested module '{specifier}' {} '{export_name}' which is exported by '{referrer}'",
        .failure.reason()
    )]
    UnresolvedIndirectExport {
        specifier: String,
        export_name: String,
        referrer: String,
        failure: ResolutionFailure,
    },
    #[error("module '{module}' cannot be evaluated in status {status:?}")]
    InvalidStatus { module: String, status: ModuleStatus },
    #[error("shared module '{0}' is being evaluated by this thread outside of the current walk")]
    SharedModuleBusy(String),
    #[error("unknown module {0}")]
    UnknownModule(ModuleId),
    #[error("host error: {0:?}")]
    Host(JsError<V>),
    #[error("uncaught exception: {0:?}")]
    Evaluation(JsError<V>),
}

impl<V: Debug> ModuleError<V> {
    /// The kind of error object the host should create for this error.
    pub fn exception_type(&self) -> ExceptionType {
        match self {
            ModuleError::UnresolvedImport { .. } | ModuleError::UnresolvedIndirectExport { .. } => {
                ExceptionType::SyntaxError
            }
            ModuleError::UnknownModule(_) => ExceptionType::ReferenceError,
            ModuleError::InvalidStatus { .. }
            | ModuleError::SharedModuleBusy(_)
            | ModuleError::Host(_)
            | ModuleError::Evaluation(_) => ExceptionType::Error,
        }
    }

    pub fn is_syntax_error(&self) -> bool {
        self.exception_type() == ExceptionType::SyntaxError
    }
}
