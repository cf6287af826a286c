//! parser for Presto/Trino type signature text, e.g. `array(map(varchar,bigint))`
//! or `row("a" bigint,"b" varchar)`.
//!
//! grammar (conceptual):
//!
//! ```text
//! signature  := IDENT ( '(' params ')' )?
//! params     := param (',' param)*
//! param      := LONG | signature | quotedName signature
//! quotedName := '"' chars '"'
//! ```

use std::fmt;

use crate::error::TypeSignatureError;

/// a parsed Presto/Trino type, either a bare base name or a base name with
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSignature {
    Scalar { base: String },
    Parameterized {
        base: String,
        params: Vec<TypeSignatureParameter>,
    },
}

impl TypeSignature {
    pub fn base(&self) -> &str {
        match self {
            Self::Scalar { base } | Self::Parameterized { base, .. } => base,
        }
    }

    pub fn params(&self) -> &[TypeSignatureParameter] {
        match self {
            Self::Scalar { .. } => &[],
            Self::Parameterized { params, .. } => params,
        }
    }

    /// parse a type signature string. fails with [TypeSignatureError] on
    /// unbalanced parentheses, trailing input, or a parameter-kind mismatch
    /// for the bases that constrain their parameter kind (`row`, `array`, `map`).
    pub fn parse(signature: &str) -> Result<Self, TypeSignatureError> {
        let mut parser = Parser::new(signature);
        let sig = parser.parse_signature()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(TypeSignatureError::new(signature, "trailing input after signature"));
        }
        Ok(sig)
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar { base } => f.write_str(base),
            Self::Parameterized { base, params } => {
                write!(f, "{base}(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// one parameter inside a parameterized type signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSignatureParameter {
    Type(TypeSignature),
    NamedType { name: String, ty: TypeSignature },
    Long(i64),
    Variable(String),
}

impl fmt::Display for TypeSignatureParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(t) => write!(f, "{t}"),
            Self::NamedType { name, ty } => write!(f, "\"{name}\" {ty}"),
            Self::Long(n) => write!(f, "{n}"),
            Self::Variable(v) => f.write_str(v),
        }
    }
}

/// bases whose parameters are required to be bare integer literals rather
/// than nested type signatures.
fn is_literal_parameterized(base: &str) -> bool {
    matches!(base, "varchar" | "char" | "decimal")
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')) {
            self.pos += 1;
        }
    }

    fn err(&self, reason: impl Into<String>) -> TypeSignatureError {
        TypeSignatureError::new(self.src, reason)
    }

    fn parse_ident(&mut self) -> Result<&'a str, TypeSignatureError> {
        self.skip_ws();
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b' ' {
                // allow internal spaces for bases like "time with time zone", but
                // trim trailing ones below.
                self.pos += 1;
            } else {
                break;
            }
        }
        let raw = &self.src[start..self.pos];
        let trimmed = raw.trim_end();
        if trimmed.is_empty() {
            return Err(self.err("expected identifier"));
        }
        // rewind to the true end of the trimmed identifier so following
        // whitespace is still available to skip_ws / the '(' check.
        self.pos = start + trimmed.len();
        Ok(trimmed)
    }

    fn parse_quoted_name(&mut self) -> Result<String, TypeSignatureError> {
        self.skip_ws();
        if self.peek() != Some(b'"') {
            return Err(self.err("expected quoted field name"));
        }
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'"' {
                let name = self.src[start..self.pos].to_string();
                self.pos += 1;
                return Ok(name);
            }
            self.pos += 1;
        }
        Err(self.err("unterminated quoted field name"))
    }

    fn parse_long(&mut self) -> Option<i64> {
        self.skip_ws();
        let start = self.pos;
        let mut p = self.pos;
        if self.bytes.get(p) == Some(&b'-') {
            p += 1;
        }
        let digits_start = p;
        while self.bytes.get(p).is_some_and(u8::is_ascii_digit) {
            p += 1;
        }
        if p == digits_start {
            return None;
        }
        let text = &self.src[start..p];
        match text.parse::<i64>() {
            Ok(n) => {
                self.pos = p;
                Some(n)
            }
            Err(_) => None,
        }
    }

    fn parse_signature(&mut self) -> Result<TypeSignature, TypeSignatureError> {
        let base = self.parse_ident()?.to_string();
        self.skip_ws();
        if self.peek() != Some(b'(') {
            return Ok(TypeSignature::Scalar { base });
        }
        self.pos += 1;
        let params = self.parse_params(&base)?;
        self.skip_ws();
        if self.peek() != Some(b')') {
            return Err(self.err("unbalanced parentheses"));
        }
        self.pos += 1;
        Ok(TypeSignature::Parameterized { base, params })
    }

    fn parse_params(&mut self, base: &str) -> Result<Vec<TypeSignatureParameter>, TypeSignatureError> {
        let mut params = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b')') {
                break;
            }
            params.push(self.parse_param(base)?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                _ => break,
            }
        }
        self.validate_param_kinds(base, &params)?;
        Ok(params)
    }

    fn parse_param(&mut self, base: &str) -> Result<TypeSignatureParameter, TypeSignatureError> {
        self.skip_ws();
        if base == "row" {
            let name = self.parse_quoted_name()?;
            let ty = self.parse_signature()?;
            return Ok(TypeSignatureParameter::NamedType { name, ty });
        }
        if is_literal_parameterized(base) {
            if let Some(n) = self.parse_long() {
                return Ok(TypeSignatureParameter::Long(n));
            }
            // decimal precision/scale are bare longs; fall through for anything
            // unexpected so the base-specific validation below reports it.
        }
        if self.peek() == Some(b'"') {
            let name = self.parse_quoted_name()?;
            let ty = self.parse_signature()?;
            return Ok(TypeSignatureParameter::NamedType { name, ty });
        }
        if let Some(n) = self.parse_long() {
            return Ok(TypeSignatureParameter::Long(n));
        }
        self.parse_signature().map(TypeSignatureParameter::Type)
    }

    fn validate_param_kinds(
        &self,
        base: &str,
        params: &[TypeSignatureParameter],
    ) -> Result<(), TypeSignatureError> {
        match base {
            "row" => {
                if !params.iter().all(|p| matches!(p, TypeSignatureParameter::NamedType { .. })) {
                    return Err(self.err("row parameters must all be named fields"));
                }
            }
            "array" => {
                if params.len() != 1 || !matches!(params[0], TypeSignatureParameter::Type(_)) {
                    return Err(self.err("array takes exactly one type parameter"));
                }
            }
            "map" => {
                if params.len() != 2
                    || !params
                        .iter()
                        .all(|p| matches!(p, TypeSignatureParameter::Type(_)))
                {
                    return Err(self.err("map takes exactly two type parameters"));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalar() {
        let sig = TypeSignature::parse("bigint").unwrap();
        assert_eq!(sig, TypeSignature::Scalar { base: "bigint".into() });
    }

    #[test]
    fn parses_array_of_map() {
        let sig = TypeSignature::parse("array(map(varchar,bigint))").unwrap();
        match sig {
            TypeSignature::Parameterized { base, params } => {
                assert_eq!(base, "array");
                assert_eq!(params.len(), 1);
                match &params[0] {
                    TypeSignatureParameter::Type(inner) => {
                        assert_eq!(inner.base(), "map");
                        assert_eq!(inner.params().len(), 2);
                    }
                    _ => panic!("expected Type param"),
                }
            }
            _ => panic!("expected Parameterized"),
        }
    }

    #[test]
    fn parses_row_with_named_fields() {
        let sig = TypeSignature::parse(r#"row("a" bigint,"b" array(varchar))"#).unwrap();
        let TypeSignature::Parameterized { base, params } = sig else {
            panic!("expected Parameterized");
        };
        assert_eq!(base, "row");
        assert_eq!(params.len(), 2);
        match &params[0] {
            TypeSignatureParameter::NamedType { name, ty } => {
                assert_eq!(name, "a");
                assert_eq!(ty.base(), "bigint");
            }
            _ => panic!("expected NamedType"),
        }
    }

    #[test]
    fn parses_varchar_with_length() {
        let sig = TypeSignature::parse("varchar(255)").unwrap();
        let TypeSignature::Parameterized { params, .. } = sig else {
            panic!("expected Parameterized");
        };
        assert_eq!(params, vec![TypeSignatureParameter::Long(255)]);
    }

    #[test]
    fn parses_decimal_with_precision_and_scale() {
        let sig = TypeSignature::parse("decimal(10,2)").unwrap();
        let TypeSignature::Parameterized { params, .. } = sig else {
            panic!("expected Parameterized");
        };
        assert_eq!(params, vec![TypeSignatureParameter::Long(10), TypeSignatureParameter::Long(2)]);
    }

    #[test]
    fn rejects_unbalanced_parens() {
        assert!(TypeSignature::parse("array(varchar").is_err());
    }

    #[test]
    fn rejects_trailing_input() {
        assert!(TypeSignature::parse("bigint)").is_err());
    }

    #[test]
    fn rejects_row_with_unnamed_field() {
        assert!(TypeSignature::parse("row(bigint)").is_err());
    }

    #[test]
    fn rejects_array_with_two_params() {
        assert!(TypeSignature::parse("array(bigint,bigint)").is_err());
    }

    #[test]
    fn round_trips_canonical_form() {
        for s in ["bigint", "array(varchar)", "map(varchar,bigint)", r#"row("a" bigint,"b" varchar)"#] {
            let sig = TypeSignature::parse(s).unwrap();
            assert_eq!(sig.to_string(), s);
        }
    }
}
