use std::fmt;

/// Which evidence or check produced a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// `@throws` in the override's docblock
    AnnotationThrows,
    /// A raise found by walking the override's body
    CodeThrows,
    ReturnCovariance,
    ParameterContravariance,
}

/// One inconsistency between an override and a contract it must honor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub class_name: String,
    pub method_name: String,
    pub contract_name: String,
    pub reason: String,
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        contract_name: impl Into<String>,
        kind: ViolationKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            contract_name: contract_name.into(),
            reason: reason.into(),
            kind,
        }
    }

    pub fn annotation_throws(class: &str, method: &str, contract: &str, exception: &str) -> Self {
        Self::new(
            class,
            method,
            contract,
            ViolationKind::AnnotationThrows,
            format!(
                "declares exception {} via @throws annotation, which the contract does not permit",
                exception
            ),
        )
    }

    pub fn code_throws(class: &str, method: &str, contract: &str, exception: &str) -> Self {
        Self::new(
            class,
            method,
            contract,
            ViolationKind::CodeThrows,
            format!(
                "throws exception {} in code (detected via AST analysis), which the contract does not permit",
                exception
            ),
        )
    }

    pub fn return_type(class: &str, method: &str, contract: &str, found: &str, expected: &str) -> Self {
        Self::new(
            class,
            method,
            contract,
            ViolationKind::ReturnCovariance,
            format!(
                "return type is not covariant with the contract: {} is not a subtype of {}",
                found, expected
            ),
        )
    }

    pub fn parameter_type(
        class: &str,
        method: &str,
        contract: &str,
        param: &str,
        found: &str,
        expected: &str,
    ) -> Self {
        Self::new(
            class,
            method,
            contract,
            ViolationKind::ParameterContravariance,
            format!(
                "parameter type narrows the contract's precondition: ${} accepts {}, the contract accepts {}",
                param, found, expected
            ),
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}() — contract {} — {}",
            self.class_name, self.method_name, self.contract_name, self.reason
        )
    }
}
