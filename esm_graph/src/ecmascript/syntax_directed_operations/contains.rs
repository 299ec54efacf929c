// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [8.5 Contains](https://tc39.es/ecma262/#sec-static-semantics-contains)
//!
//! Only the `await` symbol is of interest to the module graph: a module
//! whose body contains `await` outside of any function has top-level await.
//! `for await` loops and `await using` declarations count as well.
//!
//! Static semantic rules that depend upon substructure generally do not
//! look into function bodies, arrow function bodies or class bodies except
//! for computed property names.

use oxc_ast::ast;

/// ### [8.5 Contains](https://tc39.es/ecma262/#sec-static-semantics-contains)
///
/// `Contains await`.
pub(crate) trait ContainsAwait {
    fn contains_await(&self) -> bool;
}

impl ContainsAwait for ast::Program<'_> {
    fn contains_await(&self) -> bool {
        self.body.iter().any(|st| st.contains_await())
    }
}

impl<T: ContainsAwait> ContainsAwait for Option<T> {
    fn contains_await(&self) -> bool {
        self.as_ref().is_some_and(T::contains_await)
    }
}

impl ContainsAwait for ast::Function<'_> {
    fn contains_await(&self) -> bool {
        false
    }
}

impl ContainsAwait for ast::Class<'_> {
    /// ClassTail : ClassHeritageopt { ClassBody }
    fn contains_await(&self) -> bool {
        // 3. If ClassHeritage is present, then
        //   a. If ClassHeritage Contains symbol is true, return true.
        if self.super_class.as_ref().is_some_and(|e| e.contains_await()) {
            return true;
        }
        // 4. Return the result of ComputedPropertyContains of ClassBody with
        //    argument symbol.
        self.body.body.iter().any(|e| match e {
            ast::ClassElement::StaticBlock(_) | ast::ClassElement::TSIndexSignature(_) => false,
            ast::ClassElement::MethodDefinition(e) => e.key.contains_await(),
            ast::ClassElement::PropertyDefinition(p) => p.key.contains_await(),
            ast::ClassElement::AccessorProperty(p) => p.key.contains_await(),
        })
    }
}

impl ContainsAwait for ast::BindingPattern<'_> {
    fn contains_await(&self) -> bool {
        match &self.kind {
            ast::BindingPatternKind::BindingIdentifier(_) => false,
            ast::BindingPatternKind::ObjectPattern(e) => {
                e.properties
                    .iter()
                    .any(|p| p.key.contains_await() || p.value.contains_await())
                    || e.rest.as_ref().is_some_and(|e| e.argument.contains_await())
            }
            ast::BindingPatternKind::ArrayPattern(e) => {
                e.elements
                    .iter()
                    .any(|e| e.as_ref().is_some_and(|e| e.contains_await()))
                    || e.rest.as_ref().is_some_and(|e| e.argument.contains_await())
            }
            ast::BindingPatternKind::AssignmentPattern(e) => {
                e.left.contains_await() || e.right.contains_await()
            }
        }
    }
}

impl ContainsAwait for ast::PropertyKey<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::PropertyKey::StaticIdentifier(_) | ast::PropertyKey::PrivateIdentifier(_) => false,
            _ => self.as_expression().is_some_and(|e| e.contains_await()),
        }
    }
}

impl ContainsAwait for ast::Argument<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::Argument::SpreadElement(e) => e.argument.contains_await(),
            _ => self.as_expression().is_some_and(|e| e.contains_await()),
        }
    }
}

impl ContainsAwait for ast::ArrayExpressionElement<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::ArrayExpressionElement::SpreadElement(e) => e.argument.contains_await(),
            ast::ArrayExpressionElement::Elision(_) => false,
            _ => self.as_expression().is_some_and(|e| e.contains_await()),
        }
    }
}

impl ContainsAwait for ast::MemberExpression<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::MemberExpression::ComputedMemberExpression(e) => {
                e.object.contains_await() || e.expression.contains_await()
            }
            ast::MemberExpression::StaticMemberExpression(e) => e.object.contains_await(),
            ast::MemberExpression::PrivateFieldExpression(e) => e.object.contains_await(),
        }
    }
}

impl ContainsAwait for ast::ChainElement<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::ChainElement::CallExpression(e) => {
                e.callee.contains_await() || e.arguments.iter().any(|arg| arg.contains_await())
            }
            ast::ChainElement::TSNonNullExpression(e) => e.expression.contains_await(),
            _ => self
                .as_member_expression()
                .is_some_and(|e| e.contains_await()),
        }
    }
}

impl ContainsAwait for ast::AssignmentTarget<'_> {
    fn contains_await(&self) -> bool {
        if let Some(e) = self.as_simple_assignment_target() {
            e.contains_await()
        } else {
            self.as_assignment_target_pattern()
                .is_some_and(|e| e.contains_await())
        }
    }
}

impl ContainsAwait for ast::SimpleAssignmentTarget<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::SimpleAssignmentTarget::AssignmentTargetIdentifier(_) => false,
            ast::SimpleAssignmentTarget::TSAsExpression(e) => e.expression.contains_await(),
            ast::SimpleAssignmentTarget::TSSatisfiesExpression(e) => e.expression.contains_await(),
            ast::SimpleAssignmentTarget::TSNonNullExpression(e) => e.expression.contains_await(),
            ast::SimpleAssignmentTarget::TSTypeAssertion(e) => e.expression.contains_await(),
            _ => self
                .as_member_expression()
                .is_some_and(|e| e.contains_await()),
        }
    }
}

impl ContainsAwait for ast::AssignmentTargetPattern<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::AssignmentTargetPattern::ArrayAssignmentTarget(e) => {
                e.elements
                    .iter()
                    .any(|e| e.as_ref().is_some_and(|e| e.contains_await()))
                    || e.rest.as_ref().is_some_and(|e| e.target.contains_await())
            }
            ast::AssignmentTargetPattern::ObjectAssignmentTarget(e) => {
                e.properties.iter().any(|e| match e {
                    ast::AssignmentTargetProperty::AssignmentTargetPropertyIdentifier(e) => {
                        e.init.as_ref().is_some_and(|e| e.contains_await())
                    }
                    ast::AssignmentTargetProperty::AssignmentTargetPropertyProperty(e) => {
                        e.name.contains_await() || e.binding.contains_await()
                    }
                }) || e.rest.as_ref().is_some_and(|e| e.target.contains_await())
            }
        }
    }
}

impl ContainsAwait for ast::AssignmentTargetMaybeDefault<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::AssignmentTargetMaybeDefault::AssignmentTargetWithDefault(e) => {
                e.binding.contains_await() || e.init.contains_await()
            }
            _ => self
                .as_assignment_target()
                .is_some_and(|e| e.contains_await()),
        }
    }
}

impl ContainsAwait for ast::ObjectExpression<'_> {
    fn contains_await(&self) -> bool {
        self.properties.iter().any(|p| match p {
            ast::ObjectPropertyKind::ObjectProperty(p) => {
                p.key.contains_await() || p.value.contains_await()
            }
            ast::ObjectPropertyKind::SpreadProperty(p) => p.argument.contains_await(),
        })
    }
}

impl ContainsAwait for ast::Expression<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::Expression::AwaitExpression(_) => true,
            ast::Expression::BooleanLiteral(_)
            | ast::Expression::NullLiteral(_)
            | ast::Expression::NumericLiteral(_)
            | ast::Expression::BigIntLiteral(_)
            | ast::Expression::RegExpLiteral(_)
            | ast::Expression::StringLiteral(_)
            | ast::Expression::Identifier(_)
            | ast::Expression::MetaProperty(_)
            | ast::Expression::Super(_)
            | ast::Expression::ThisExpression(_) => false,
            // Function bodies are not part of the module's top level.
            ast::Expression::ArrowFunctionExpression(_)
            | ast::Expression::FunctionExpression(_) => false,
            ast::Expression::TemplateLiteral(e) => e.expressions.iter().any(|e| e.contains_await()),
            ast::Expression::ArrayExpression(e) => e.elements.iter().any(|e| e.contains_await()),
            ast::Expression::AssignmentExpression(e) => {
                e.left.contains_await() || e.right.contains_await()
            }
            ast::Expression::BinaryExpression(e) => {
                e.left.contains_await() || e.right.contains_await()
            }
            ast::Expression::CallExpression(e) => {
                e.callee.contains_await() || e.arguments.iter().any(|arg| arg.contains_await())
            }
            ast::Expression::ChainExpression(e) => e.expression.contains_await(),
            ast::Expression::ClassExpression(e) => e.contains_await(),
            ast::Expression::ConditionalExpression(e) => {
                e.test.contains_await() || e.consequent.contains_await() || e.alternate.contains_await()
            }
            ast::Expression::ImportExpression(e) => {
                e.source.contains_await() || e.options.as_ref().is_some_and(|e| e.contains_await())
            }
            ast::Expression::LogicalExpression(e) => {
                e.left.contains_await() || e.right.contains_await()
            }
            ast::Expression::NewExpression(e) => {
                e.callee.contains_await() || e.arguments.iter().any(|arg| arg.contains_await())
            }
            ast::Expression::ObjectExpression(e) => e.contains_await(),
            ast::Expression::ParenthesizedExpression(e) => e.expression.contains_await(),
            ast::Expression::SequenceExpression(e) => e.expressions.iter().any(|e| e.contains_await()),
            ast::Expression::TaggedTemplateExpression(e) => {
                e.tag.contains_await() || e.quasi.expressions.iter().any(|e| e.contains_await())
            }
            ast::Expression::UnaryExpression(e) => e.argument.contains_await(),
            ast::Expression::UpdateExpression(e) => e.argument.contains_await(),
            ast::Expression::YieldExpression(e) => e.argument.as_ref().is_some_and(|e| e.contains_await()),
            ast::Expression::PrivateInExpression(e) => e.right.contains_await(),
            ast::Expression::JSXElement(_) | ast::Expression::JSXFragment(_) => false,
            ast::Expression::TSAsExpression(e) => e.expression.contains_await(),
            ast::Expression::TSSatisfiesExpression(e) => e.expression.contains_await(),
            ast::Expression::TSTypeAssertion(e) => e.expression.contains_await(),
            ast::Expression::TSNonNullExpression(e) => e.expression.contains_await(),
            ast::Expression::TSInstantiationExpression(e) => e.expression.contains_await(),
            ast::Expression::V8IntrinsicExpression(e) => {
                e.arguments.iter().any(|e| e.contains_await())
            }
            ast::Expression::ComputedMemberExpression(e) => {
                e.object.contains_await() || e.expression.contains_await()
            }
            ast::Expression::StaticMemberExpression(e) => e.object.contains_await(),
            ast::Expression::PrivateFieldExpression(e) => e.object.contains_await(),
        }
    }
}

impl ContainsAwait for ast::VariableDeclaration<'_> {
    fn contains_await(&self) -> bool {
        // UsingDeclaration : await using BindingList ;
        self.kind == ast::VariableDeclarationKind::AwaitUsing
            || self
                .declarations
                .iter()
                .any(|d| d.id.contains_await() || d.init.as_ref().is_some_and(|e| e.contains_await()))
    }
}

impl ContainsAwait for ast::ForStatementLeft<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::ForStatementLeft::VariableDeclaration(e) => e.contains_await(),
            _ => self
                .as_assignment_target()
                .is_some_and(|e| e.contains_await()),
        }
    }
}

impl ContainsAwait for ast::ForStatementInit<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::ForStatementInit::VariableDeclaration(e) => e.contains_await(),
            _ => self.as_expression().is_some_and(|e| e.contains_await()),
        }
    }
}

impl ContainsAwait for ast::Statement<'_> {
    fn contains_await(&self) -> bool {
        match self {
            ast::Statement::BlockStatement(st) => st.body.iter().any(|st| st.contains_await()),
            ast::Statement::BreakStatement(_)
            | ast::Statement::ContinueStatement(_)
            | ast::Statement::DebuggerStatement(_)
            | ast::Statement::EmptyStatement(_) => false,
            ast::Statement::DoWhileStatement(st) => st.body.contains_await() || st.test.contains_await(),
            ast::Statement::ExpressionStatement(st) => st.expression.contains_await(),
            ast::Statement::ForInStatement(st) => {
                st.left.contains_await() || st.right.contains_await() || st.body.contains_await()
            }
            ast::Statement::ForOfStatement(st) => {
                // for await ( ... of AssignmentExpression ) Statement
                st.r#await
                    || st.left.contains_await()
                    || st.right.contains_await()
                    || st.body.contains_await()
            }
            ast::Statement::ForStatement(st) => {
                st.init.contains_await()
                    || st.test.as_ref().is_some_and(|e| e.contains_await())
                    || st.update.as_ref().is_some_and(|e| e.contains_await())
                    || st.body.contains_await()
            }
            ast::Statement::IfStatement(st) => {
                st.test.contains_await()
                    || st.consequent.contains_await()
                    || st.alternate.contains_await()
            }
            ast::Statement::LabeledStatement(st) => st.body.contains_await(),
            ast::Statement::ReturnStatement(st) => st.argument.as_ref().is_some_and(|e| e.contains_await()),
            ast::Statement::SwitchStatement(st) => {
                st.discriminant.contains_await()
                    || st.cases.iter().any(|case| {
                        case.test.as_ref().is_some_and(|e| e.contains_await())
                            || case.consequent.iter().any(|st| st.contains_await())
                    })
            }
            ast::Statement::ThrowStatement(st) => st.argument.contains_await(),
            ast::Statement::TryStatement(st) => {
                st.block.body.iter().any(|st| st.contains_await())
                    || st.handler.as_ref().is_some_and(|handler| {
                        handler
                            .param
                            .as_ref()
                            .is_some_and(|param| param.pattern.contains_await())
                            || handler.body.body.iter().any(|st| st.contains_await())
                    })
                    || st
                        .finalizer
                        .as_ref()
                        .is_some_and(|finalizer| finalizer.body.iter().any(|st| st.contains_await()))
            }
            ast::Statement::WhileStatement(st) => st.test.contains_await() || st.body.contains_await(),
            ast::Statement::WithStatement(st) => st.object.contains_await() || st.body.contains_await(),
            ast::Statement::VariableDeclaration(st) => st.contains_await(),
            ast::Statement::FunctionDeclaration(st) => st.contains_await(),
            ast::Statement::ClassDeclaration(st) => st.contains_await(),
            ast::Statement::ImportDeclaration(_) | ast::Statement::ExportAllDeclaration(_) => false,
            ast::Statement::ExportDefaultDeclaration(st) => match &st.declaration {
                ast::ExportDefaultDeclarationKind::FunctionDeclaration(f) => f.contains_await(),
                ast::ExportDefaultDeclarationKind::ClassDeclaration(c) => c.contains_await(),
                ast::ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => false,
                _ => st
                    .declaration
                    .as_expression()
                    .is_some_and(|e| e.contains_await()),
            },
            ast::Statement::ExportNamedDeclaration(st) => {
                st.declaration.as_ref().is_some_and(|decl| match decl {
                    ast::Declaration::VariableDeclaration(e) => e.contains_await(),
                    ast::Declaration::FunctionDeclaration(f) => f.contains_await(),
                    ast::Declaration::ClassDeclaration(c) => c.contains_await(),
                    _ => false,
                })
            }
            // TypeScript syntax is rejected by the parser configuration.
            ast::Statement::TSTypeAliasDeclaration(_)
            | ast::Statement::TSInterfaceDeclaration(_)
            | ast::Statement::TSEnumDeclaration(_)
            | ast::Statement::TSModuleDeclaration(_)
            | ast::Statement::TSImportEqualsDeclaration(_)
            | ast::Statement::TSExportAssignment(_)
            | ast::Statement::TSNamespaceExportDeclaration(_) => false,
        }
    }
}
