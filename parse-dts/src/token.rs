use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::loc::Loc;

/// Token type.
///
/// Only reserved words get keyword variants. TypeScript's contextual keywords (`type`,
/// `interface`, `declare`, `namespace`, `keyof`, `infer`, ...) are lexed as
/// [`TT::Identifier`] and recognised by the parser from their text.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum TT {
  // Special token used to represent the end of the source code. Easier than using and handling Option everywhere.
  EOF,
  // Special token used to represent invalid source code, so that peeking never needs error handling.
  Invalid,

  Ampersand,
  AmpersandAmpersand,
  // Every compound assignment operator (`+=`, `??=`, ...); they only appear inside opaque code.
  AssignmentOperator,
  Asterisk,
  AsteriskAsterisk,
  At,
  Bar,
  BarBar,
  BraceClose,
  BraceOpen,
  BracketClose,
  BracketOpen,
  Caret,
  ChevronLeft,
  ChevronLeftChevronLeft,
  ChevronLeftEquals,
  // Always a single `>`; the parser joins adjacent ones where a shift or comparison is meant so
  // that `A<B<C>>` closes two type argument lists.
  ChevronRight,
  Colon,
  Comma,
  Dot,
  DotDotDot,
  Equals,
  EqualsChevronRight,
  EqualsEquals,
  EqualsEqualsEquals,
  Exclamation,
  ExclamationEquals,
  ExclamationEqualsEquals,
  Hyphen,
  HyphenHyphen,
  ParenthesisClose,
  ParenthesisOpen,
  Percent,
  Plus,
  PlusPlus,
  Question,
  QuestionDot,
  QuestionQuestion,
  Semicolon,
  Slash,
  Tilde,

  Identifier,
  PrivateName,

  KeywordBreak,
  KeywordCase,
  KeywordCatch,
  KeywordClass,
  KeywordConst,
  KeywordContinue,
  KeywordDebugger,
  KeywordDefault,
  KeywordDelete,
  KeywordDo,
  KeywordElse,
  KeywordEnum,
  KeywordExport,
  KeywordExtends,
  KeywordFinally,
  KeywordFor,
  KeywordFunction,
  KeywordIf,
  KeywordImport,
  KeywordIn,
  KeywordInstanceof,
  KeywordNew,
  KeywordReturn,
  KeywordSuper,
  KeywordSwitch,
  KeywordThis,
  KeywordThrow,
  KeywordTry,
  KeywordTypeof,
  KeywordVar,
  KeywordVoid,
  KeywordWhile,
  KeywordWith,

  LiteralBigInt,
  LiteralFalse,
  LiteralNull,
  LiteralNumber,
  LiteralRegex,
  LiteralString,
  LiteralTrue,
  // A template without substitutions: `abc`.
  LiteralTemplate,
  // `abc${
  TemplateHead,
  // }abc${
  TemplateMiddle,
  // }abc`
  TemplateTail,
}

impl TT {
  pub fn is_keyword(self) -> bool {
    matches!(
      self,
      TT::KeywordBreak
        | TT::KeywordCase
        | TT::KeywordCatch
        | TT::KeywordClass
        | TT::KeywordConst
        | TT::KeywordContinue
        | TT::KeywordDebugger
        | TT::KeywordDefault
        | TT::KeywordDelete
        | TT::KeywordDo
        | TT::KeywordElse
        | TT::KeywordEnum
        | TT::KeywordExport
        | TT::KeywordExtends
        | TT::KeywordFinally
        | TT::KeywordFor
        | TT::KeywordFunction
        | TT::KeywordIf
        | TT::KeywordImport
        | TT::KeywordIn
        | TT::KeywordInstanceof
        | TT::KeywordNew
        | TT::KeywordReturn
        | TT::KeywordSuper
        | TT::KeywordSwitch
        | TT::KeywordThis
        | TT::KeywordThrow
        | TT::KeywordTry
        | TT::KeywordTypeof
        | TT::KeywordVar
        | TT::KeywordVoid
        | TT::KeywordWhile
        | TT::KeywordWith
        | TT::LiteralFalse
        | TT::LiteralNull
        | TT::LiteralTrue
    )
  }

  /// Whether the token can be used as a property name or after a `.` (any identifier name).
  pub fn is_identifier_name(self) -> bool {
    self == TT::Identifier || self.is_keyword()
  }
}

#[derive(Clone, Debug)]
pub struct Token {
  pub loc: Loc,
  // Whether one or more whitespace characters appear immediately before this token, and at least
  // one of those whitespace characters is a line terminator.
  pub preceded_by_line_terminator: bool,
  pub typ: TT,
}

impl Token {
  pub fn error(&self, typ: SyntaxErrorType) -> SyntaxError {
    self.loc.error(typ, Some(self.typ))
  }
}
