//! BIR (Test IR) parser implementation.

use super::*;
use std::collections::HashMap;

pub fn parse_ir(text: &str) -> Result<TestIR, String> {
    let parser = Parser::new(text);
    parser.parse()
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    ir: TestIR,

    // Per-function value names. Defs must precede uses.
    values: HashMap<&'a str, u32>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            ir: TestIR::new(),
            values: HashMap::new(),
        }
    }

    fn parse(mut self) -> Result<TestIR, String> {
        self.skip_whitespace();

        while !self.is_eof() {
            match self.parse_function() {
                Ok(_) => {}
                Err(e) => {
                    let context_start = self.pos.saturating_sub(20);
                    let context_end = (self.pos + 20).min(self.text.len());
                    return Err(format!(
                        "at position {}: {} (near '{}')",
                        self.pos,
                        e,
                        &self.text[context_start..context_end]
                    ));
                }
            }
            self.skip_whitespace();
        }

        Ok(self.ir)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn current_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == ';' {
                // Skip comment line
                while let Some(ch) = self.current_char() {
                    self.advance();
                    if ch == '\n' {
                        break;
                    }
                }
            } else if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn try_read(&mut self, ch: char) -> bool {
        self.skip_whitespace();
        if self.current_char() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), String> {
        if !self.try_read(ch) {
            return Err(format!(
                "Expected '{}' but found {:?}",
                ch,
                self.current_char()
            ));
        }
        Ok(())
    }

    fn read_identifier(&mut self) -> Result<&'a str, String> {
        self.skip_whitespace();
        let start = self.pos;

        match self.current_char() {
            Some(ch) if ch.is_alphabetic() || ch == '_' => {}
            Some(ch) => return Err(format!("Expected identifier but found '{}'", ch)),
            None => return Err("Expected identifier but found EOF".to_string()),
        }

        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        Ok(&self.text[start..self.pos])
    }

    /// Consume `keyword` if it is next, otherwise leave the position alone.
    fn try_keyword(&mut self, keyword: &str) -> bool {
        let saved = self.pos;
        match self.read_identifier() {
            Ok(id) if id == keyword => true,
            _ => {
                self.pos = saved;
                false
            }
        }
    }

    fn read_value(&mut self) -> Result<u32, String> {
        self.skip_whitespace();
        self.expect('%')?;
        let name = self.read_identifier()?;
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| format!("Use of undefined value '%{}'", name))
    }

    fn read_number(&mut self) -> Result<i64, String> {
        self.skip_whitespace();
        let start = self.pos;
        if self.current_char() == Some('-') {
            self.advance();
        }
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        let number_str = &self.text[start..self.pos];
        number_str
            .parse()
            .map_err(|e| format!("Failed to parse number '{}': {}", number_str, e))
    }

    fn read_type(&mut self) -> Result<TypeKind, String> {
        let name = self.read_identifier()?;
        TypeKind::from_str(name).ok_or_else(|| format!("Unknown type '{}'", name))
    }

    fn push_op(&mut self, name: &str, kind: OpKind, region: u32) -> u32 {
        let id = self.ir.ops.len() as u32;
        let pos = self.ir.regions[region as usize].len() as u32;
        self.ir.ops.push(OpData {
            name: name.to_string(),
            kind,
            region,
            pos,
        });
        self.ir.regions[region as usize].push(id);
        id
    }

    fn parse_function(&mut self) -> Result<(), String> {
        let func_name = self.read_identifier()?;
        if self.ir.functions.iter().any(|f| f.name == func_name) {
            return Err(format!("Duplicate function definition: '{}'", func_name));
        }

        self.values.clear();

        let body = self.ir.regions.len() as u32;
        self.ir.regions.push(Vec::new());
        self.ir.functions.push(Function {
            name: func_name.to_string(),
            body,
        });

        self.expect('{')?;
        while !self.try_read('}') {
            self.parse_statement(body)?;
        }

        Ok(())
    }

    fn parse_statement(&mut self, region: u32) -> Result<(), String> {
        self.skip_whitespace();
        if self.current_char() == Some('%') {
            self.advance();
            let name = self.read_identifier()?;
            if self.values.contains_key(name) {
                return Err(format!("Redefinition of value '%{}'", name));
            }
            self.expect('=')?;
            let id = self.parse_def(name, region)?;
            self.values.insert(name, id);
            return Ok(());
        }

        let keyword = self.read_identifier()?;
        let kind = match keyword {
            "store" => {
                let value = self.read_value()?;
                self.expect(',')?;
                let addr = self.read_value()?;
                OpKind::Store { value, addr }
            }
            "yield" => OpKind::Yield(self.read_value()?),
            "assign" => {
                let src = self.read_value()?;
                if !self.try_keyword("to") {
                    return Err("Expected 'to' in assign".to_string());
                }
                let dst = self.read_value()?;
                let realloc = self.try_keyword("realloc");
                OpKind::Assign { src, dst, realloc }
            }
            "destroy" => {
                let value = self.read_value()?;
                let finalize = self.try_keyword("finalize");
                OpKind::Destroy { value, finalize }
            }
            "mayalias" => {
                let a = self.read_value()?;
                self.expect(',')?;
                let b = self.read_value()?;
                OpKind::MayAlias { a, b }
            }
            other => return Err(format!("Unknown statement '{}'", other)),
        };
        self.push_op("", kind, region);
        Ok(())
    }

    fn parse_def(&mut self, name: &'a str, region: u32) -> Result<u32, String> {
        let keyword = self.read_identifier()?;
        let kind = match keyword {
            "const" => OpKind::Const(self.read_number()?),
            "scalar" => OpKind::Scalar(self.read_type()?),
            "shape" => {
                let mut extents = vec![self.read_value()?];
                while self.try_read(',') {
                    extents.push(self.read_value()?);
                }
                OpKind::Shape(extents)
            }
            "array" => {
                let shape = self.read_value()?;
                self.expect(':')?;
                OpKind::Array { shape, ty: self.read_type()? }
            }
            "designate" => self.parse_designate()?,
            "load" => OpKind::Load(self.read_value()?),
            "add" => {
                let a = self.read_value()?;
                self.expect(',')?;
                OpKind::Add(a, self.read_value()?)
            }
            "sub" => {
                let a = self.read_value()?;
                self.expect(',')?;
                OpKind::Sub(a, self.read_value()?)
            }
            "mul" => {
                let a = self.read_value()?;
                self.expect(',')?;
                OpKind::Mul(a, self.read_value()?)
            }
            "convert" => OpKind::Convert(self.read_value()?),
            "lbound" => {
                let base = self.read_value()?;
                self.expect(',')?;
                OpKind::LBound { base, dim: self.read_number()? as usize }
            }
            "elemental" => return self.parse_elemental(name, region),
            "call" => {
                let pure_call = self.try_keyword("pure");
                self.expect('@')?;
                let callee = self.read_identifier()?.to_string();
                self.expect('(')?;
                let mut args = Vec::new();
                while !self.try_read(')') {
                    args.push(self.read_value()?);
                    if !self.try_read(',') && self.current_char() != Some(')') {
                        return Err("Expected ',' or ')' in call arguments".to_string());
                    }
                }
                OpKind::Call { callee, args, pure_call }
            }
            other => return Err(format!("Unknown operation '{}'", other)),
        };
        Ok(self.push_op(name, kind, region))
    }

    fn parse_designate(&mut self) -> Result<OpKind, String> {
        let base = self.read_value()?;

        let component = if self.try_keyword("component") {
            Some(self.read_identifier()?.to_string())
        } else {
            None
        };

        self.expect('[')?;
        let mut subscripts = Vec::new();
        while !self.try_read(']') {
            let first = self.read_value()?;
            if self.try_read(':') {
                let ub = self.read_value()?;
                self.expect(':')?;
                let stride = self.read_value()?;
                subscripts.push(SubscriptData::Triplet { lb: first, ub, stride });
            } else {
                subscripts.push(SubscriptData::Index(first));
            }
            if !self.try_read(',') && self.current_char() != Some(']') {
                return Err("Expected ',' or ']' in subscript list".to_string());
            }
        }

        let substring = if self.try_keyword("substr") {
            let l = self.read_value()?;
            self.expect(',')?;
            let u = self.read_value()?;
            Some((l, u))
        } else {
            None
        };

        let complex_part = if self.try_keyword("real") {
            Some(ComplexPart::Real)
        } else if self.try_keyword("imag") {
            Some(ComplexPart::Imag)
        } else {
            None
        };

        let params = if self.try_keyword("params") {
            let mut params = vec![self.read_value()?];
            while self.try_read(',') {
                params.push(self.read_value()?);
            }
            params
        } else {
            Vec::new()
        };

        Ok(OpKind::Designate { base, component, subscripts, substring, complex_part, params })
    }

    fn parse_elemental(&mut self, name: &'a str, region: u32) -> Result<u32, String> {
        let shape = self.read_value()?;
        let ordered = self.try_keyword("ordered");
        let temp = self.try_keyword("temp");

        let body = self.ir.regions.len() as u32;
        self.ir.regions.push(Vec::new());

        // Induction values are region arguments, modeled as index ops at
        // the head of the body region.
        self.expect('(')?;
        let mut indices = Vec::new();
        while !self.try_read(')') {
            self.skip_whitespace();
            self.expect('%')?;
            let index_name = self.read_identifier()?;
            if self.values.contains_key(index_name) {
                return Err(format!("Redefinition of value '%{}'", index_name));
            }
            let id = self.push_op(index_name, OpKind::Index, body);
            self.values.insert(index_name, id);
            indices.push(id);
            if !self.try_read(',') && self.current_char() != Some(')') {
                return Err("Expected ',' or ')' in index list".to_string());
            }
        }

        self.expect('{')?;
        while !self.try_read('}') {
            self.parse_statement(body)?;
        }

        match self.ir.regions[body as usize].last() {
            Some(&last) if matches!(self.ir.ops[last as usize].kind, OpKind::Yield(_)) => {}
            _ => return Err("Elemental body must end with a yield".to_string()),
        }

        let kind = OpKind::Elemental { shape, indices, body, ordered, temp };
        Ok(self.push_op(name, kind, region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_function() {
        let ir = TestIR::parse(
            r#"
            ; trivial module
            main {
                %c1 = const 1
                %c10 = const 10
                %shp = shape %c10
                %a = array %shp : i64
            }
            "#,
        )
        .unwrap();
        assert_eq!(ir.functions.len(), 1);
        assert_eq!(ir.functions[0].name, "main");
        assert_eq!(ir.ops.len(), 4);
        assert!(matches!(ir.ops[3].kind, OpKind::Array { .. }));
    }

    #[test]
    fn parses_elemental_with_body() {
        let ir = TestIR::parse(
            r#"
            main {
                %c1 = const 1
                %c10 = const 10
                %shp = shape %c10
                %a = array %shp : i64
                %e = elemental %shp (%i) {
                    %d = designate %a [%i]
                    %v = load %d
                    %r = add %v, %c1
                    yield %r
                }
                assign %e to %a
                destroy %e
            }
            "#,
        )
        .unwrap();
        let elemental = ir
            .ops
            .iter()
            .find(|op| matches!(op.kind, OpKind::Elemental { .. }))
            .unwrap();
        let OpKind::Elemental { indices, body, ordered, temp, .. } = &elemental.kind else {
            unreachable!();
        };
        assert_eq!(indices.len(), 1);
        assert!(!*ordered);
        assert!(!*temp);
        // index + designate + load + add + yield
        assert_eq!(ir.regions[*body as usize].len(), 5);
    }

    #[test]
    fn parses_triplet_subscripts() {
        let ir = TestIR::parse(
            r#"
            main {
                %c1 = const 1
                %c5 = const 5
                %c10 = const 10
                %shp = shape %c10
                %a = array %shp : f64
                %s = designate %a [%c1:%c5:%c1]
            }
            "#,
        )
        .unwrap();
        let designate = ir.ops.iter().find(|op| op.name == "s").unwrap();
        let OpKind::Designate { subscripts, .. } = &designate.kind else {
            unreachable!();
        };
        assert!(matches!(subscripts[0], SubscriptData::Triplet { .. }));
    }

    #[test]
    fn rejects_use_before_def() {
        let err = TestIR::parse("main { %x = add %y, %y }").unwrap_err();
        assert!(err.contains("undefined value"));
    }

    #[test]
    fn rejects_elemental_without_yield() {
        let err = TestIR::parse(
            r#"
            main {
                %c10 = const 10
                %shp = shape %c10
                %e = elemental %shp (%i) {
                    %x = add %i, %i
                }
            }
            "#,
        )
        .unwrap_err();
        assert!(err.contains("yield"));
    }

    #[test]
    fn print_round_trips_through_parse() {
        let text = r#"
            main {
                %c0 = const 0
                %c10 = const 10
                %shp = shape %c10
                %a = array %shp : i64
                assign %c0 to %a
            }
            "#;
        let ir = TestIR::parse(text).unwrap();
        let printed = ir.print();
        assert!(printed.contains("Function main"));
        assert!(printed.contains("assign %c0 to %a"));
    }
}
