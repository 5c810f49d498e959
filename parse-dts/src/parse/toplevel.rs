use super::Parser;
use crate::ast::NodeId;
use crate::error::SyntaxResult;
use crate::token::TT;

impl<'a> Parser<'a> {
  /// Parses statements up to (not including) `end` or the end of input.
  ///
  /// In lenient mode a statement that fails to parse is re-read as an opaque statement.
  pub fn stmt_list(&mut self, end: TT) -> SyntaxResult<Vec<NodeId>> {
    let mut body = Vec::new();
    loop {
      let t = self.peek();
      if t.typ == end || t.typ == TT::EOF {
        break;
      }
      let comments = self.take_leading_comments();
      let stmt = if self.options().lenient {
        let cp = self.checkpoint();
        match self.stmt() {
          Ok(stmt) => stmt,
          Err(_) => {
            self.restore_checkpoint(cp);
            self.opaque_stmt()?
          }
        }
      } else {
        self.stmt()?
      };
      self.ast().node_mut(stmt).leading_comments = comments;
      body.push(stmt);
    }
    Ok(body)
  }

  pub fn parse_top_level(&mut self) -> SyntaxResult<Vec<NodeId>> {
    let body = self.stmt_list(TT::EOF)?;
    self.require(TT::EOF)?;
    Ok(body)
  }
}
