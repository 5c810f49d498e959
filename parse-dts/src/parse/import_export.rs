use super::Parser;
use crate::ast::stmt::*;
use crate::ast::Ident;
use crate::ast::NodeId;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::literal::unquote;
use crate::token::TT;

impl<'a> Parser<'a> {
  /// A module export name: an identifier name or a string literal.
  fn module_export_name(&mut self) -> SyntaxResult<String> {
    let t = self.consume();
    match t.typ {
      TT::LiteralString => Ok(unquote(self.str(t.loc))),
      tt if tt.is_identifier_name() => Ok(self.string(t.loc)),
      _ => Err(t.error(SyntaxErrorType::ExpectedSyntax("export name"))),
    }
  }

  /// Skips `with { ... }` / `assert { ... }` import attributes.
  fn skip_import_attributes(&mut self) -> SyntaxResult<()> {
    let t = self.peek();
    if (t.typ == TT::KeywordWith || self.is_word(&t, "assert")) && !t.preceded_by_line_terminator {
      self.consume();
      self.opaque_block()?;
    }
    Ok(())
  }

  /// Whether a `type` keyword at the head of a specifier marks it type-only, as opposed to
  /// naming a binding called `type` (`{ type }`, `{ type as t }`).
  fn specifier_is_type_only(&mut self) -> bool {
    if !self.peek_word("type") {
      return false;
    }
    let n1 = self.peek_nth(1);
    if !(n1.typ.is_identifier_name() || n1.typ == TT::LiteralString) {
      return false;
    }
    if self.is_word(&n1, "as") {
      // `type as` and `type as as x` refer to a type-only `as`; `type as x` renames `type`.
      let n2 = self.peek_nth(2);
      return self.is_word(&n2, "as") || n2.typ == TT::Comma || n2.typ == TT::BraceClose;
    }
    true
  }

  pub fn import_stmt(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.require(TT::KeywordImport)?;
    if self.peek().typ == TT::LiteralString {
      let source = self.string_literal()?;
      self.skip_import_attributes()?;
      self.consume_semicolon()?;
      return Ok(self.finish(start, ImportDecl {
        type_only: false,
        default: None,
        namespace: None,
        named: None,
        source,
      }));
    }

    let mut type_only = false;
    if self.peek_word("type") {
      let n1 = self.peek_nth(1);
      let marks_type_only = match n1.typ {
        TT::BraceOpen | TT::Asterisk => true,
        // `import type from "m"` imports a default binding named `type`.
        TT::Identifier if self.is_word(&n1, "from") => {
          let n2 = self.peek_nth(2);
          self.is_word(&n2, "from")
        }
        TT::Identifier => true,
        _ => false,
      };
      if marks_type_only {
        self.consume();
        type_only = true;
      }
    }

    if self.peek().typ == TT::Identifier && self.peek_nth(1).typ == TT::Equals {
      return self.import_equals(start, false, type_only);
    }

    let mut default = None;
    let mut namespace = None;
    let mut named = None;
    if self.peek().typ == TT::Identifier {
      default = Some(self.binding_ident()?);
      if !self.consume_if(TT::Comma).is_match() {
        return self.finish_import(start, type_only, default, namespace, named);
      }
    }
    if self.consume_if(TT::Asterisk).is_match() {
      self.require_word("as")?;
      namespace = Some(self.binding_ident()?);
    } else {
      named = Some(self.list(TT::BraceOpen, TT::BraceClose, |p| {
        p.import_specifier()
      })?);
    }
    self.finish_import(start, type_only, default, namespace, named)
  }

  fn finish_import(
    &mut self,
    start: usize,
    type_only: bool,
    default: Option<NodeId>,
    namespace: Option<NodeId>,
    named: Option<Vec<NodeId>>,
  ) -> SyntaxResult<NodeId> {
    self.require_word("from")?;
    let source = self.string_literal()?;
    self.skip_import_attributes()?;
    self.consume_semicolon()?;
    Ok(self.finish(start, ImportDecl {
      type_only,
      default,
      namespace,
      named,
      source,
    }))
  }

  fn import_specifier(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let type_only = self.specifier_is_type_only();
    if type_only {
      self.consume();
    }
    let imported_token = self.peek();
    let imported = self.module_export_name()?;
    let local = if self.consume_if_word("as") {
      self.binding_ident()?
    } else {
      if imported_token.typ != TT::Identifier {
        return Err(imported_token.error(SyntaxErrorType::ExpectedSyntax("`as`")));
      }
      self.alloc(imported_token.loc, Ident {
        name: imported.clone(),
      })
    };
    Ok(self.finish(start, ImportSpecifier {
      type_only,
      imported,
      local,
    }))
  }

  /// `import x = require("m");` or `import x = a.b;` after the `import` (and `type`) keywords.
  pub fn import_equals(
    &mut self,
    start: usize,
    export: bool,
    type_only: bool,
  ) -> SyntaxResult<NodeId> {
    let name = self.binding_ident()?;
    self.require(TT::Equals)?;
    let target = if self.peek_word("require") && self.peek_nth(1).typ == TT::ParenthesisOpen {
      self.consume();
      self.require(TT::ParenthesisOpen)?;
      let source = self.string_literal()?;
      self.require(TT::ParenthesisClose)?;
      ImportEqualsTarget::Require(source)
    } else {
      ImportEqualsTarget::Entity(self.entity_name()?)
    };
    self.consume_semicolon()?;
    Ok(self.finish(start, ImportEquals {
      export,
      type_only,
      name,
      target,
    }))
  }

  pub fn export_stmt(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    self.require(TT::KeywordExport)?;
    let t = self.peek();
    match t.typ {
      TT::KeywordDefault => {
        self.consume();
        if self.is_default_decl_start() {
          return self.decl(start, DeclFlags {
            export: true,
            default: true,
            declare: false,
          });
        }
        let expr = self.assignment_expr()?;
        self.consume_semicolon()?;
        Ok(self.finish(start, ExportDefaultExpr { expr }))
      }
      TT::Equals => {
        self.consume();
        let expr = self.assignment_expr()?;
        self.consume_semicolon()?;
        Ok(self.finish(start, ExportAssign { expr }))
      }
      TT::Asterisk => self.export_all(start, false),
      TT::BraceOpen => self.export_named(start, false),
      TT::KeywordImport => {
        self.consume();
        let type_only = self.peek_word("type") && self.peek_nth(2).typ == TT::Equals;
        if type_only {
          self.consume();
        }
        self.import_equals(start, true, type_only)
      }
      TT::Identifier if self.is_word(&t, "as") => {
        self.consume();
        self.require_word("namespace")?;
        let name = self.require_identifier()?;
        self.consume_semicolon()?;
        Ok(self.finish(start, ExportAsNamespace { name }))
      }
      TT::Identifier
        if self.is_word(&t, "type")
          && matches!(self.peek_nth(1).typ, TT::BraceOpen | TT::Asterisk) =>
      {
        self.consume();
        if self.peek().typ == TT::Asterisk {
          self.export_all(start, true)
        } else {
          self.export_named(start, true)
        }
      }
      _ => self.decl(start, DeclFlags {
        export: true,
        default: false,
        declare: false,
      }),
    }
  }

  /// `function`, `async function`, `class`, `abstract class` or `interface` after
  /// `export default`.
  fn is_default_decl_start(&mut self) -> bool {
    let t = self.peek();
    match t.typ {
      TT::KeywordFunction | TT::KeywordClass => true,
      TT::Identifier => {
        let next = self.peek_nth(1);
        if next.preceded_by_line_terminator {
          return false;
        }
        match self.str(t.loc) {
          "async" => next.typ == TT::KeywordFunction,
          "abstract" => next.typ == TT::KeywordClass,
          "interface" => next.typ == TT::Identifier,
          _ => false,
        }
      }
      _ => false,
    }
  }

  fn export_all(&mut self, start: usize, type_only: bool) -> SyntaxResult<NodeId> {
    self.require(TT::Asterisk)?;
    let alias = if self.consume_if_word("as") {
      Some(self.module_export_name()?)
    } else {
      None
    };
    self.require_word("from")?;
    let source = self.string_literal()?;
    self.skip_import_attributes()?;
    self.consume_semicolon()?;
    Ok(self.finish(start, ExportAll {
      type_only,
      alias,
      source,
    }))
  }

  fn export_named(&mut self, start: usize, type_only: bool) -> SyntaxResult<NodeId> {
    let specifiers = self.list(TT::BraceOpen, TT::BraceClose, |p| {
      p.export_specifier()
    })?;
    let source = if self.consume_if_word("from") {
      Some(self.string_literal()?)
    } else {
      None
    };
    self.skip_import_attributes()?;
    self.consume_semicolon()?;
    Ok(self.finish(start, ExportNamed {
      type_only,
      specifiers,
      source,
    }))
  }

  fn export_specifier(&mut self) -> SyntaxResult<NodeId> {
    let start = self.start();
    let type_only = self.specifier_is_type_only();
    if type_only {
      self.consume();
    }
    let local_loc = self.peek().loc;
    let local_name = self.module_export_name()?;
    let local = self.alloc(local_loc, Ident {
      name: local_name.clone(),
    });
    let exported = if self.consume_if_word("as") {
      self.module_export_name()?
    } else {
      local_name
    };
    Ok(self.finish(start, ExportSpecifier {
      type_only,
      local,
      exported,
    }))
  }
}
