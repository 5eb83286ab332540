//! Declaration binding and checking.
//!
//! Variable declarations register both a symbol and a memory object.
//! Function declarations open fresh scopes, bind generics and parameters,
//! and enforce the reserved-prefix and usurping rules. Type declarations
//! register type symbols used later for field lookup and `Crashable`
//! checking.

use forge_ast::{
    ClassDecl, Decl, DeclKind, FeatureDecl, FunctionDecl, ImplementationDecl, StructDecl,
    VariableDecl, VariantDecl,
};
use forge_common::diagnostics::ErrorKind;
use forge_common::span::Span;
use forge_memory::wrapper::is_hijacked_name;
use forge_memory::{TypeInfo, decode_wrapper};
use tracing::trace;

use crate::state::AnalyzerState;
use crate::symbols::{FunctionSymbol, Symbol, TypeSymbol};

/// Prefixes reserved for generated failable-function variants.
const RESERVED_PREFIXES: &[&str] = &["try_", "check_", "find_"];

impl AnalyzerState {
    pub(crate) fn visit_decl(&mut self, decl: &Decl) {
        match &decl.kind {
            DeclKind::Variable(var) => self.visit_variable_decl(var, decl.span),
            DeclKind::Function(func) => self.visit_function_decl(func, decl.span),
            DeclKind::Class(class) => self.visit_class_decl(class, decl.span),
            DeclKind::Struct(st) => self.visit_struct_decl(st, decl.span),
            DeclKind::Variant(variant) => self.visit_variant_decl(variant, decl.span),
            DeclKind::Feature(feature) => self.visit_feature_decl(feature, decl.span),
            DeclKind::Implementation(imp) => self.visit_implementation_decl(imp),
            DeclKind::Namespace { name, declarations } => {
                self.visit_namespace_decl(name, declarations, decl.span);
            }
            DeclKind::Preset { name, value } => {
                let ty = self.type_of_expr(value);
                if !self.symbols.try_declare(Symbol::Variable {
                    name: name.clone(),
                    ty,
                    mutable: false,
                    visibility: forge_ast::Visibility::Public,
                }) {
                    self.error_at(
                        decl.span,
                        ErrorKind::DuplicateDeclaration,
                        format!("`{name}` is already declared in this scope"),
                    );
                }
            }
            DeclKind::External { declarations } => {
                for inner in declarations {
                    self.visit_decl(inner);
                }
            }
            // Module-path resolution happens outside the core; these carry
            // no symbols of their own.
            DeclKind::Import { .. } | DeclKind::Using { .. } => {}
        }
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    pub(crate) fn visit_variable_decl(&mut self, var: &VariableDecl, span: Span) {
        let mut inferred: Option<TypeInfo> = None;

        if let Some(init) = &var.initializer {
            if let Some(name) = init.identifier_name()
                && self.is_scoped_token(name)
            {
                self.error_expr(
                    init,
                    ErrorKind::InlineTokenEscape,
                    format!("scoped token `{name}` cannot be stored in a variable"),
                );
            }

            let init_ty = self.type_of_expr(init);
            // A `.view()` result is inline-only; binding it would let the
            // token outlive its expression.
            if self.inline_tokens.get(&init.id) == Some(&"view") {
                self.error_expr(
                    init,
                    ErrorKind::InlineTokenEscape,
                    "a `view` token cannot initialize a variable; use a `viewing` block",
                );
            }
            inferred = Some(init_ty);
        }

        let declared = var.declared_type.clone().map(|ty| self.resolve_type(&ty));
        let resolved = match (&declared, &inferred) {
            (Some(decl_ty), Some(init_ty)) => {
                if *decl_ty != *init_ty
                    && !decl_ty.is_unknown()
                    && !init_ty.is_unknown()
                    && !decl_ty.is_generic_param
                {
                    self.error_at(
                        span,
                        ErrorKind::TypeError,
                        format!(
                            "`{}` is declared as `{decl_ty}` but initialized with `{init_ty}`",
                            var.name
                        ),
                    );
                }
                decl_ty.clone()
            }
            (Some(decl_ty), None) => decl_ty.clone(),
            (None, Some(init_ty)) => init_ty.clone(),
            (None, None) => {
                self.error_at(
                    span,
                    ErrorKind::TypeError,
                    format!("`{}` needs a type or an initializer", var.name),
                );
                TypeInfo::unknown()
            }
        };

        // `let b = a` participates in the language's move/alias model.
        let moved_from_object = var
            .initializer
            .as_ref()
            .and_then(|init| init.identifier_name())
            .filter(|source| self.memory.contains(source))
            .map(str::to_string);

        if let Some(source) = moved_from_object {
            if let Err(error) = self.memory.bind_from_object(&var.name, &source, span) {
                self.report_memory_error(error);
                self.memory.declare(&var.name, resolved.clone(), None, span);
            }
            self.stats.objects_registered += 1;
            self.declare_variable_symbol(var, resolved, span);
        } else {
            let (kind, object_ty) = match decode_wrapper(&resolved.name) {
                Some((kind, base)) => (Some(kind), TypeInfo::named(base)),
                None => (None, resolved.clone()),
            };
            self.memory.declare(&var.name, object_ty, kind, span);
            self.stats.objects_registered += 1;
            self.declare_variable_symbol(var, resolved, span);
        }
    }

    fn declare_variable_symbol(&mut self, var: &VariableDecl, ty: TypeInfo, span: Span) {
        if !self.symbols.try_declare(Symbol::Variable {
            name: var.name.clone(),
            ty,
            mutable: var.mutable,
            visibility: var.visibility,
        }) {
            self.error_at(
                span,
                ErrorKind::DuplicateDeclaration,
                format!("`{}` is already declared in this scope", var.name),
            );
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    pub(crate) fn visit_function_decl(&mut self, func: &FunctionDecl, span: Span) {
        trace!(name = %func.name, "function declaration");

        let base_name = func.name.strip_suffix('!').unwrap_or(&func.name);
        if RESERVED_PREFIXES
            .iter()
            .any(|prefix| base_name.starts_with(prefix))
        {
            self.error_at(
                span,
                ErrorKind::ReservedPrefix,
                format!(
                    "`{}` uses a reserved variant prefix; `try_`, `check_`, and `find_` \
                     names are generated",
                    func.name
                ),
            );
        }

        // The explicit flag is authoritative. The name heuristic is kept for
        // sources predating the flag and will be removed with them.
        let is_usurping =
            func.is_usurping || func.name.contains("usurping") || func.name.contains("Usurping");

        let return_type = func
            .return_type
            .as_ref()
            .map(|ty| self.resolve_type(ty))
            .unwrap_or_else(TypeInfo::none);

        if is_hijacked_name(&return_type.name) && !is_usurping {
            self.error_at(
                span,
                ErrorKind::UsurpingViolation,
                format!(
                    "`{}` returns `{return_type}` but is not declared usurping",
                    func.name
                ),
            );
        }

        let param_types: Vec<TypeInfo> = func
            .params
            .iter()
            .map(|param| {
                // Resolve against the outer scope; generic parameter names
                // are handled once the function scope opens below.
                self.resolve_type(&param.ty)
            })
            .collect();

        let symbol_name = match &func.type_qualifier {
            Some(qualifier) => format!("{qualifier}.{}", func.name),
            None => func.name.clone(),
        };
        if !self.symbols.try_declare(Symbol::Function(FunctionSymbol {
            name: symbol_name,
            params: param_types.clone(),
            return_type: return_type.clone(),
            visibility: func.visibility,
            is_usurping,
            generics: func.generics.clone(),
        })) {
            self.error_at(
                span,
                ErrorKind::DuplicateDeclaration,
                format!("`{}` is already declared in this scope", func.name),
            );
        }

        self.enter_scope();
        for generic in &func.generics {
            self.symbols.try_declare(Symbol::Type(TypeSymbol::TypeParam {
                name: generic.clone(),
            }));
        }
        for (param, ty) in func.params.iter().zip(&param_types) {
            let (kind, object_ty) = match decode_wrapper(&ty.name) {
                Some((kind, base)) => (Some(kind), TypeInfo::named(base)),
                None => (None, ty.clone()),
            };
            self.memory.declare(&param.name, object_ty, kind, param.span);
            self.stats.objects_registered += 1;
            self.symbols.try_declare(Symbol::Variable {
                name: param.name.clone(),
                ty: ty.clone(),
                mutable: false,
                visibility: forge_ast::Visibility::Private,
            });
        }

        let saved_usurping = self.in_usurping_function;
        let saved_return = self.current_return_type.take();
        self.in_usurping_function = is_usurping;
        self.current_return_type = Some(return_type);

        for stmt in &func.body.statements {
            self.visit_stmt(stmt);
        }

        self.in_usurping_function = saved_usurping;
        self.current_return_type = saved_return;
        self.exit_scope();
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn visit_class_decl(&mut self, class: &ClassDecl, span: Span) {
        let fields = self.collect_fields(&class.members);
        if !self.symbols.try_declare(Symbol::Type(TypeSymbol::Class {
            name: class.name.clone(),
            generics: class.generics.clone(),
            features: class.features.clone(),
            fields,
        })) {
            self.error_at(
                span,
                ErrorKind::DuplicateDeclaration,
                format!("`{}` is already declared in this scope", class.name),
            );
        }
        self.visit_member_functions(&class.members);
    }

    fn visit_struct_decl(&mut self, st: &StructDecl, span: Span) {
        let fields: Vec<(String, TypeInfo)> = st
            .fields
            .iter()
            .map(|field| (field.name.clone(), self.resolve_type(&field.ty)))
            .collect();
        if !self.symbols.try_declare(Symbol::Type(TypeSymbol::Struct {
            name: st.name.clone(),
            generics: st.generics.clone(),
            fields,
        })) {
            self.error_at(
                span,
                ErrorKind::DuplicateDeclaration,
                format!("`{}` is already declared in this scope", st.name),
            );
        }
    }

    fn visit_variant_decl(&mut self, variant: &VariantDecl, span: Span) {
        let cases = variant.cases.iter().map(|case| case.name.clone()).collect();
        if !self.symbols.try_declare(Symbol::Type(TypeSymbol::Variant {
            name: variant.name.clone(),
            generics: variant.generics.clone(),
            cases,
        })) {
            self.error_at(
                span,
                ErrorKind::DuplicateDeclaration,
                format!("`{}` is already declared in this scope", variant.name),
            );
        }
    }

    fn visit_feature_decl(&mut self, feature: &FeatureDecl, span: Span) {
        if !self.symbols.try_declare(Symbol::Type(TypeSymbol::Feature {
            name: feature.name.clone(),
        })) {
            self.error_at(
                span,
                ErrorKind::DuplicateDeclaration,
                format!("`{}` is already declared in this scope", feature.name),
            );
        }
    }

    fn visit_implementation_decl(&mut self, imp: &ImplementationDecl) {
        // Implementations contribute methods; the feature list itself is
        // recorded on the class declaration.
        self.visit_member_functions(&imp.members);
    }

    fn visit_namespace_decl(&mut self, name: &str, declarations: &[Decl], _span: Span) {
        for inner in declarations {
            match &inner.kind {
                DeclKind::Function(func) => {
                    // Namespace members are addressed as `Namespace.member`.
                    let mut qualified = func.clone();
                    qualified.type_qualifier = Some(name.to_string());
                    self.visit_function_decl(&qualified, inner.span);
                }
                _ => self.visit_decl(inner),
            }
        }
    }

    fn collect_fields(&mut self, members: &[Decl]) -> Vec<(String, TypeInfo)> {
        let mut fields = Vec::new();
        for member in members {
            if let DeclKind::Variable(var) = &member.kind
                && let Some(ty) = &var.declared_type
            {
                let resolved = self.resolve_type(ty);
                fields.push((var.name.clone(), resolved));
            }
        }
        fields
    }

    fn visit_member_functions(&mut self, members: &[Decl]) {
        for member in members {
            if let DeclKind::Function(func) = &member.kind {
                self.visit_function_decl(func, member.span);
            }
        }
    }
}
