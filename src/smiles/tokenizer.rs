use crate::element::Element;
use crate::smiles::error::SmilesError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Atom(AtomToken),
    Bond(BondSym),
    RingClosure { bond: Option<BondSym>, id: u16 },
    OpenParen(usize),
    CloseParen(usize),
    Dot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomToken {
    pub element: Element,
    pub is_aromatic: bool,
    pub isotope: u16,
    pub chirality: ChiralityTok,
    pub hcount: Option<u8>,
    pub charge: i8,
    pub is_bracket: bool,
}

/// Chirality marker as written in a bracket atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChiralityTok {
    #[default]
    None,
    /// `@`
    CounterClockwise,
    /// `@@`
    Clockwise,
}

/// Bond symbol as written between two atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondSym {
    Single,
    Double,
    Triple,
    Aromatic,
    /// `/` directional single bond
    Up,
    /// `\` directional single bond
    Down,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, SmilesError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
            }
            '[' => {
                let (tok, next) = parse_bracket_atom(&chars, i)?;
                tokens.push(Token::Atom(tok));
                i = next;
            }
            'B' => {
                if chars.get(i + 1) == Some(&'r') {
                    tokens.push(Token::Atom(bare_atom(Element::Br, false)));
                    i += 2;
                } else {
                    tokens.push(Token::Atom(bare_atom(Element::B, false)));
                    i += 1;
                }
            }
            'C' => {
                if chars.get(i + 1) == Some(&'l') {
                    tokens.push(Token::Atom(bare_atom(Element::Cl, false)));
                    i += 2;
                } else {
                    tokens.push(Token::Atom(bare_atom(Element::C, false)));
                    i += 1;
                }
            }
            'N' => {
                tokens.push(Token::Atom(bare_atom(Element::N, false)));
                i += 1;
            }
            'O' => {
                tokens.push(Token::Atom(bare_atom(Element::O, false)));
                i += 1;
            }
            'P' => {
                tokens.push(Token::Atom(bare_atom(Element::P, false)));
                i += 1;
            }
            'S' => {
                tokens.push(Token::Atom(bare_atom(Element::S, false)));
                i += 1;
            }
            'F' => {
                tokens.push(Token::Atom(bare_atom(Element::F, false)));
                i += 1;
            }
            'I' => {
                tokens.push(Token::Atom(bare_atom(Element::I, false)));
                i += 1;
            }
            'b' => {
                tokens.push(Token::Atom(bare_atom(Element::B, true)));
                i += 1;
            }
            'c' => {
                tokens.push(Token::Atom(bare_atom(Element::C, true)));
                i += 1;
            }
            'n' => {
                tokens.push(Token::Atom(bare_atom(Element::N, true)));
                i += 1;
            }
            'o' => {
                tokens.push(Token::Atom(bare_atom(Element::O, true)));
                i += 1;
            }
            'p' => {
                tokens.push(Token::Atom(bare_atom(Element::P, true)));
                i += 1;
            }
            's' => {
                tokens.push(Token::Atom(bare_atom(Element::S, true)));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Bond(BondSym::Single));
                i += 1;
            }
            '=' => {
                tokens.push(Token::Bond(BondSym::Double));
                i += 1;
            }
            '#' => {
                tokens.push(Token::Bond(BondSym::Triple));
                i += 1;
            }
            ':' => {
                tokens.push(Token::Bond(BondSym::Aromatic));
                i += 1;
            }
            '/' => {
                tokens.push(Token::Bond(BondSym::Up));
                i += 1;
            }
            '\\' => {
                tokens.push(Token::Bond(BondSym::Down));
                i += 1;
            }
            '(' => {
                tokens.push(Token::OpenParen(i));
                i += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen(i));
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            d @ '0'..='9' => {
                // A digit following an atom (or a bond symbol) is a
                // ring-bond marker. The preceding Bond token, if any, is
                // folded into the marker.
                let bond = match tokens.last() {
                    Some(Token::Bond(b)) => {
                        let b = *b;
                        tokens.pop();
                        Some(b)
                    }
                    _ => None,
                };
                tokens.push(Token::RingClosure {
                    bond,
                    id: d as u16 - '0' as u16,
                });
                i += 1;
            }
            '%' => {
                let d1 = chars.get(i + 1).and_then(|c| c.to_digit(10));
                let d2 = chars.get(i + 2).and_then(|c| c.to_digit(10));
                match (d1, d2) {
                    (Some(a), Some(b)) => {
                        let bond = match tokens.last() {
                            Some(Token::Bond(bd)) => {
                                let bd = *bd;
                                tokens.pop();
                                Some(bd)
                            }
                            _ => None,
                        };
                        tokens.push(Token::RingClosure {
                            bond,
                            id: (a * 10 + b) as u16,
                        });
                        i += 3;
                    }
                    _ => return Err(SmilesError::UnexpectedChar { pos: i, ch: '%' }),
                }
            }
            ch => return Err(SmilesError::UnexpectedChar { pos: i, ch }),
        }
    }

    Ok(tokens)
}

fn bare_atom(element: Element, is_aromatic: bool) -> AtomToken {
    AtomToken {
        element,
        is_aromatic,
        isotope: 0,
        chirality: ChiralityTok::None,
        hcount: None,
        charge: 0,
        is_bracket: false,
    }
}

fn parse_bracket_atom(chars: &[char], start: usize) -> Result<(AtomToken, usize), SmilesError> {
    let mut i = start + 1;

    let mut isotope: u16 = 0;
    while i < chars.len() && chars[i].is_ascii_digit() {
        isotope = isotope
            .checked_mul(10)
            .and_then(|v| v.checked_add(chars[i] as u16 - '0' as u16))
            .ok_or(SmilesError::InvalidIsotope { pos: i })?;
        i += 1;
    }

    if i >= chars.len() {
        return Err(SmilesError::UnclosedBracket { pos: start });
    }

    let sym_start = i;
    let is_aromatic = chars[i].is_ascii_lowercase();
    let mut symbol = String::new();
    if chars[i].is_ascii_alphabetic() {
        symbol.push(chars[i].to_ascii_uppercase());
        i += 1;
        // Two-letter symbols: longest match wins.
        if i < chars.len()
            && chars[i].is_ascii_lowercase()
            && Element::from_symbol(&format!("{}{}", symbol, chars[i])).is_some()
        {
            symbol.push(chars[i]);
            i += 1;
        }
    } else {
        return Err(SmilesError::UnexpectedChar {
            pos: i,
            ch: chars[i],
        });
    }

    let element = Element::from_symbol(&symbol).ok_or_else(|| SmilesError::InvalidElement {
        pos: sym_start,
        text: symbol.clone(),
    })?;

    let mut chirality = ChiralityTok::None;
    if i < chars.len() && chars[i] == '@' {
        if chars.get(i + 1) == Some(&'@') {
            chirality = ChiralityTok::Clockwise;
            i += 2;
        } else {
            chirality = ChiralityTok::CounterClockwise;
            i += 1;
        }
    }

    let mut hcount = Some(0);
    if i < chars.len() && chars[i] == 'H' {
        i += 1;
        let mut h = 1u8;
        if i < chars.len() && chars[i].is_ascii_digit() {
            h = chars[i] as u8 - b'0';
            i += 1;
        }
        hcount = Some(h);
    }

    let mut charge: i8 = 0;
    while i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
        let sign: i8 = if chars[i] == '+' { 1 } else { -1 };
        i += 1;
        if i < chars.len() && chars[i].is_ascii_digit() {
            let n = chars[i] as i8 - b'0' as i8;
            charge = charge
                .checked_add(sign.checked_mul(n).ok_or(SmilesError::InvalidCharge { pos: i })?)
                .ok_or(SmilesError::InvalidCharge { pos: i })?;
            i += 1;
        } else {
            charge = charge
                .checked_add(sign)
                .ok_or(SmilesError::InvalidCharge { pos: i })?;
        }
    }

    // Atom class; parsed and discarded, depiction has no use for it.
    if i < chars.len() && chars[i] == ':' {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }

    if i >= chars.len() || chars[i] != ']' {
        return Err(SmilesError::UnclosedBracket { pos: start });
    }

    Ok((
        AtomToken {
            element,
            is_aromatic,
            isotope,
            chirality,
            hcount,
            charge,
            is_bracket: true,
        },
        i + 1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ethanol() {
        let tokens = tokenize("CCO").unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[2], Token::Atom(a) if a.element == Element::O));
    }

    #[test]
    fn two_letter_element() {
        let tokens = tokenize("CBr").unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(matches!(&tokens[1], Token::Atom(a) if a.element == Element::Br));
    }

    #[test]
    fn ring_closure_takes_preceding_bond() {
        let tokens = tokenize("C=1CC=1").unwrap();
        assert!(matches!(
            tokens[1],
            Token::RingClosure {
                bond: Some(BondSym::Double),
                id: 1
            }
        ));
    }

    #[test]
    fn percent_ring_id() {
        let tokens = tokenize("C%12CCCCC%12").unwrap();
        let ids: Vec<u16> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::RingClosure { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![12, 12]);
    }

    #[test]
    fn bracket_atom_full() {
        let tokens = tokenize("[13CH3+]").unwrap();
        let Token::Atom(a) = &tokens[0] else {
            panic!("expected atom");
        };
        assert_eq!(a.element, Element::C);
        assert_eq!(a.isotope, 13);
        assert_eq!(a.hcount, Some(3));
        assert_eq!(a.charge, 1);
        assert!(a.is_bracket);
    }

    #[test]
    fn chirality_tokens() {
        let tokens = tokenize("[C@H](F)(Cl)Br").unwrap();
        let Token::Atom(a) = &tokens[0] else {
            panic!("expected atom");
        };
        assert_eq!(a.chirality, ChiralityTok::CounterClockwise);
        assert_eq!(a.hcount, Some(1));

        let tokens = tokenize("[C@@H](F)(Cl)Br").unwrap();
        let Token::Atom(a) = &tokens[0] else {
            panic!("expected atom");
        };
        assert_eq!(a.chirality, ChiralityTok::Clockwise);
    }

    #[test]
    fn charge_with_digit() {
        let tokens = tokenize("[O-2]").unwrap();
        let Token::Atom(a) = &tokens[0] else {
            panic!("expected atom");
        };
        assert_eq!(a.charge, -2);
    }

    #[test]
    fn aromatic_lowercase() {
        let tokens = tokenize("c1ccccc1").unwrap();
        let aromatic = tokens
            .iter()
            .filter(|t| matches!(t, Token::Atom(a) if a.is_aromatic))
            .count();
        assert_eq!(aromatic, 6);
    }

    #[test]
    fn slash_bonds() {
        let tokens = tokenize("F/C=C/F").unwrap();
        assert!(matches!(tokens[1], Token::Bond(BondSym::Up)));
    }

    #[test]
    fn unclosed_bracket() {
        assert_eq!(
            tokenize("[CH3"),
            Err(SmilesError::UnclosedBracket { pos: 0 })
        );
    }

    #[test]
    fn garbage_char() {
        assert!(matches!(
            tokenize("C?C"),
            Err(SmilesError::UnexpectedChar { ch: '?', .. })
        ));
    }
}
