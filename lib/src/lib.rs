//! Balancing of chemical equations with exact rational arithmetic.
//!
//! An unbalanced equation such as `H2 + O2 -> H2O` is parsed into per-compound
//! element counts, turned into a stoichiometric matrix (element rows, compound
//! columns, products negated) and solved by computing the null space of that
//! matrix over [`Rational`] numbers. The single basis vector of the null space
//! is scaled to the smallest positive integer coefficients.
//!
//! The two entry points are [`balance`] and [`verify`]:
//!
//! ```
//! use chembal::{balance, verify};
//!
//! let balanced = balance("H2 + O2 -> H2O").unwrap();
//! assert_eq!(balanced.to_string(), "2 H2 + 1 O2 → 2 H2O");
//!
//! let verification = verify(&balanced.to_string());
//! assert!(verification.is_balanced);
//! ```

use malachite::num::arithmetic::traits::{Abs, Gcd, Lcm};
use malachite::num::basic::traits::{One, Zero};
use malachite::{Natural, Rational};
use mendeleev::{ALL_ELEMENTS, Element};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::iter::zip;
use thiserror::Error;





/// Side separators accepted in an input equation
pub const SEPARATORS: [&str; 3] = ["->", "→", "="];

/// Arrow used when rendering a balanced equation
pub const RENDER_ARROW: char = '→';

/// Aggregate atom count per element on one side of an equation (or in one compound)
pub type ElementTally = HashMap<Element, i64>;





/// Errors that can occur while parsing or balancing an equation
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum BalanceError {
    /// The equation does not have exactly two sides
    #[error("equation must have exactly two sides separated by '->', '→' or '='")]
    MalformedEquation,
    /// A compound string is not a readable molecular formula
    #[error("{0:?} is not a valid molecular formula")]
    UnparseableFormula(String),
    /// An element symbol does not exist in the periodic table
    #[error("{0:?} is not a known element symbol")]
    UnknownElement(String),
    /// The stoichiometric matrix has an empty null space, or its only
    /// solution would force a zero or negative coefficient
    #[error("equation cannot be balanced")]
    NoSolution,
    /// The null space has dimension greater than one, so the stoichiometric
    /// ratios are not uniquely determined
    #[error("equation does not have a unique minimal solution")]
    UnderdeterminedSystem,
    /// An atom count or a balanced coefficient does not fit in `i64`
    #[error("atom counts or coefficients do not fit in 64-bit integers")]
    CoefficientOverflow,
}





/// A chemical compound and its per-element atom counts (e.g. H2O, NaCl, ...)
///
/// Parenthesized groups are expanded recursively, so `Fe2(SO4)3` counts the
/// sulfur and oxygen atoms of every sulfate group. `[` `]` and `(` `)` are
/// interchangeable group delimiters.
///
/// # Example
/// ```
/// use chembal::Compound;
/// use mendeleev::Element;
/// use std::collections::HashMap;
///
/// let compound = Compound::parse("Fe2(SO4)3").unwrap();
///
/// let expected = HashMap::from([(Element::Fe, 2), (Element::S, 3), (Element::O, 12)]);
/// assert_eq!(compound.elements(), &expected);
/// assert_eq!(compound.original_str(), "Fe2(SO4)3");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Compound {
    /// String from which the compound was parsed
    original_str: String,
    /// Atom count per element
    elements: ElementTally,
}
impl Compound {
    /// Parse a molecular formula into a compound.
    ///
    /// Element symbols are one uppercase letter optionally followed by one
    /// lowercase letter and are validated against the periodic table. Each
    /// symbol or group may carry a trailing count (default 1). Repeated
    /// occurrences of the same element are summed, never overwritten.
    ///
    /// # Arguments
    /// * `input` - formula string, e.g. `"C2H5OH"`
    /// # Returns
    /// * `Ok` - parsed compound
    /// * `Err` - error describing why the formula is unreadable
    /// # Example
    /// ```
    /// use chembal::Compound;
    /// use mendeleev::Element;
    /// use std::collections::HashMap;
    ///
    /// let compound = Compound::parse("C2H5OH").unwrap();
    ///
    /// let expected = HashMap::from([(Element::C, 2), (Element::H, 6), (Element::O, 1)]);
    /// assert_eq!(compound.elements(), &expected);
    /// ```
    pub fn parse(input: &str) -> Result<Self, BalanceError> {
        let original_str = input.trim().to_string();
        let letters: Vec<char> = original_str.chars().filter(|c| !c.is_whitespace()).collect();

        let mut pos = 0;
        let elements = parse_group(&letters, &mut pos, 0, &original_str)?;
        if elements.is_empty() {
            return Err(BalanceError::UnparseableFormula(original_str));
        }

        Ok(Self { original_str, elements })
    }

    /// Returns the string from which the compound was parsed
    pub fn original_str(&self) -> &str {
        &self.original_str
    }

    /// Returns the atom count per element in the compound
    ///
    /// Every stored count is at least 1; elements that do not occur in the
    /// formula have no entry.
    pub fn elements(&self) -> &ElementTally {
        &self.elements
    }
}

/// Parses one grouping level of a formula, starting at `pos`.
///
/// Returns when the input ends or, at `depth > 0`, when a closing delimiter
/// is reached (the delimiter itself is left for the caller to consume).
fn parse_group(
    letters: &[char],
    pos: &mut usize,
    depth: usize,
    original: &str,
) -> Result<ElementTally, BalanceError> {
    let mut counts = ElementTally::new();

    while *pos < letters.len() {
        match letters[*pos] {
            '(' | '[' => {
                *pos += 1;
                let inner = parse_group(letters, pos, depth + 1, original)?;
                if *pos >= letters.len() || !matches!(letters[*pos], ')' | ']') {
                    return Err(BalanceError::UnparseableFormula(original.to_string()));
                }
                *pos += 1;
                if inner.is_empty() {
                    return Err(BalanceError::UnparseableFormula(original.to_string()));
                }
                let multiplier = read_count(letters, pos, original)?;
                for (element, count) in inner {
                    let scaled = count
                        .checked_mul(multiplier)
                        .ok_or(BalanceError::CoefficientOverflow)?;
                    let entry = counts.entry(element).or_insert(0);
                    *entry = entry.checked_add(scaled).ok_or(BalanceError::CoefficientOverflow)?;
                }
            }
            ')' | ']' => {
                if depth == 0 {
                    return Err(BalanceError::UnparseableFormula(original.to_string()));
                }
                return Ok(counts);
            }
            'A'..='Z' => {
                let mut symbol = letters[*pos].to_string();
                *pos += 1;
                if *pos < letters.len() && letters[*pos].is_ascii_lowercase() {
                    symbol.push(letters[*pos]);
                    *pos += 1;
                }
                let element = *ALL_ELEMENTS
                    .iter()
                    .find(|e| e.symbol() == symbol)
                    .ok_or_else(|| BalanceError::UnknownElement(symbol.clone()))?;
                let count = read_count(letters, pos, original)?;
                let entry = counts.entry(element).or_insert(0);
                *entry = entry.checked_add(count).ok_or(BalanceError::CoefficientOverflow)?;
            }
            _ => return Err(BalanceError::UnparseableFormula(original.to_string())),
        }
    }

    Ok(counts)
}

/// Reads a digit run as an atom count or group multiplier, defaulting to 1.
/// A count of zero is rejected, an element with count 0 is never recorded.
fn read_count(letters: &[char], pos: &mut usize, original: &str) -> Result<i64, BalanceError> {
    let start = *pos;
    while *pos < letters.len() && letters[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos == start {
        return Ok(1);
    }

    let digits: String = letters[start..*pos].iter().collect();
    let count = digits
        .parse::<i64>()
        .map_err(|_| BalanceError::UnparseableFormula(original.to_string()))?;
    if count == 0 {
        return Err(BalanceError::UnparseableFormula(original.to_string()));
    }
    Ok(count)
}





/// A chemical equation split into reagent and product compounds, before balancing
///
/// # Example
/// ```
/// use chembal::{Compound, Equation};
///
/// let equation = Equation::parse("H2 + O2 -> H2O").unwrap();
///
/// let expected_reagents = vec![
///     Compound::parse("H2").unwrap(),
///     Compound::parse("O2").unwrap(),
/// ];
/// let expected_products = vec![Compound::parse("H2O").unwrap()];
///
/// assert_eq!(equation.reagents(), &expected_reagents);
/// assert_eq!(equation.products(), &expected_products);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Equation {
    /// String from which the equation was parsed
    original_str: String,
    /// Compounds on the left side
    reagents: Vec<Compound>,
    /// Compounds on the right side
    products: Vec<Compound>,
}
impl Equation {
    /// Parse an equation with exactly two sides separated by `->`, `→` or `=`.
    ///
    /// Each side is a `+`-joined list of molecular formulas. The input carries
    /// no coefficients, those are computed by [`Equation::balance`].
    ///
    /// # Arguments
    /// * `input` - equation string, e.g. `"Al + HCl -> AlCl3 + H2"`
    /// # Returns
    /// * `Ok` - parsed equation
    /// * `Err` - [`BalanceError::MalformedEquation`] if the separator is
    ///   missing or the equation has more than two sides, otherwise the first
    ///   compound parse error
    pub fn parse(input: &str) -> Result<Self, BalanceError> {
        let mut sides = None;
        for separator in SEPARATORS {
            if input.contains(separator) {
                let parts: Vec<&str> = input.split(separator).collect();
                if parts.len() != 2 {
                    return Err(BalanceError::MalformedEquation);
                }
                sides = Some((parts[0], parts[1]));
                break;
            }
        }
        let (reagents_str, products_str) = sides.ok_or(BalanceError::MalformedEquation)?;

        let parse_side = |side: &str| -> Result<Vec<Compound>, BalanceError> {
            side.split('+').map(|compound| Compound::parse(compound.trim())).collect()
        };

        Ok(Self {
            original_str: input.to_string(),
            reagents: parse_side(reagents_str)?,
            products: parse_side(products_str)?,
        })
    }

    /// Compute the minimal positive integer coefficients that balance the equation.
    ///
    /// Builds the stoichiometric matrix (one row per element, sorted by symbol
    /// for deterministic output; one column per compound, products negated) and
    /// computes its null space over the rationals. The single basis vector is
    /// scaled by the least common multiple of its denominators and reduced by
    /// the greatest common divisor of the resulting integers, so the returned
    /// coefficients always have gcd 1.
    ///
    /// # Returns
    /// * `Ok` - the balanced equation
    /// * `Err` - [`BalanceError::NoSolution`] if the null space is empty or
    ///   the solution ray has zero or mixed-sign entries,
    ///   [`BalanceError::UnderdeterminedSystem`] if the null space has more
    ///   than one dimension
    /// # Example
    /// ```
    /// use chembal::Equation;
    ///
    /// let equation = Equation::parse("Al + HCl -> AlCl3 + H2").unwrap();
    /// let balanced = equation.balance().unwrap();
    ///
    /// assert_eq!(balanced.to_string(), "2 Al + 6 HCl → 2 AlCl3 + 3 H2");
    /// ```
    pub fn balance(&self) -> Result<BalancedEquation, BalanceError> {
        // sorted union of all elements in the equation, one matrix row each
        let mut element_set = HashSet::new();
        for compound in self.reagents.iter().chain(self.products.iter()) {
            for element in compound.elements.keys() {
                element_set.insert(*element);
            }
        }
        let mut elements: Vec<Element> = element_set.into_iter().collect();
        elements.sort_by_key(|element| element.symbol());

        // stoichiometric matrix, product columns negated so that M * x = 0
        let columns = self.reagents.len() + self.products.len();
        let mut matrix = Vec::with_capacity(elements.len());
        for element in &elements {
            let mut row = Vec::with_capacity(columns);
            for compound in &self.reagents {
                row.push(Rational::from(compound.elements.get(element).copied().unwrap_or(0)));
            }
            for compound in &self.products {
                row.push(Rational::from(-compound.elements.get(element).copied().unwrap_or(0)));
            }
            matrix.push(row);
        }

        let mut basis = null_space(matrix, columns);
        if basis.is_empty() {
            return Err(BalanceError::NoSolution);
        }
        if basis.len() > 1 {
            return Err(BalanceError::UnderdeterminedSystem);
        }
        let mut vector = basis.remove(0);

        // scale the rational basis vector to integers
        let mut lcm = Natural::ONE;
        for value in vector.iter() {
            lcm = lcm.lcm(value.denominator_ref());
        }
        for value in &mut vector {
            *value = &*value * &Rational::from(&lcm);
        }
        let mut coefficients = Vec::with_capacity(columns);
        for value in vector.iter() {
            coefficients.push(i64::try_from(value).map_err(|_| BalanceError::CoefficientOverflow)?);
        }

        // a valid coefficient vector is a single ray, so a sign flip must be
        // global; zero or mixed-sign entries mean the equation as written
        // cannot balance
        if coefficients.iter().any(|&c| c == 0)
            || (coefficients.iter().any(|&c| c > 0) && coefficients.iter().any(|&c| c < 0))
        {
            return Err(BalanceError::NoSolution);
        }
        for coefficient in &mut coefficients {
            *coefficient = coefficient.abs();
        }

        // explicit gcd reduction guarantees minimality
        let mut divisor = Natural::ZERO;
        for coefficient in coefficients.iter() {
            divisor = divisor.gcd(&Natural::from(coefficient.unsigned_abs()));
        }
        let divisor = i64::try_from(&divisor).map_err(|_| BalanceError::CoefficientOverflow)?;
        for coefficient in &mut coefficients {
            *coefficient /= divisor;
        }

        let (reagent_coefficients, product_coefficients) = coefficients.split_at(self.reagents.len());
        Ok(BalancedEquation {
            reagent_terms: zip(reagent_coefficients.iter(), self.reagents.iter())
                .map(|(&coefficient, compound)| (coefficient, compound.original_str.clone()))
                .collect(),
            product_terms: zip(product_coefficients.iter(), self.products.iter())
                .map(|(&coefficient, compound)| (coefficient, compound.original_str.clone()))
                .collect(),
        })
    }

    /// Returns the string from which the equation was parsed
    pub fn original_str(&self) -> &str {
        &self.original_str
    }

    /// Returns the reagent compounds
    pub fn reagents(&self) -> &Vec<Compound> {
        &self.reagents
    }

    /// Returns the product compounds
    pub fn products(&self) -> &Vec<Compound> {
        &self.products
    }
}

/// A balanced equation: positive integer coefficients paired with the original
/// compound strings, in input order
///
/// Renders with a fixed `→` arrow and a single space between coefficient and
/// formula; a coefficient of 1 is printed like any other.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BalancedEquation {
    /// Coefficient and formula of each reagent
    reagent_terms: Vec<(i64, String)>,
    /// Coefficient and formula of each product
    product_terms: Vec<(i64, String)>,
}
impl BalancedEquation {
    /// Returns the coefficient and formula of each reagent
    pub fn reagent_terms(&self) -> &Vec<(i64, String)> {
        &self.reagent_terms
    }

    /// Returns the coefficient and formula of each product
    pub fn product_terms(&self) -> &Vec<(i64, String)> {
        &self.product_terms
    }

    /// Returns all coefficients in matrix column order (reagents then products)
    ///
    /// The greatest common divisor of the returned values is always 1.
    pub fn coefficients(&self) -> Vec<i64> {
        self.reagent_terms
            .iter()
            .chain(self.product_terms.iter())
            .map(|(coefficient, _)| *coefficient)
            .collect()
    }
}
impl Display for BalancedEquation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, (coefficient, formula)) in self.reagent_terms.iter().enumerate() {
            if i != 0 {
                write!(f, " + ")?;
            }
            write!(f, "{} {}", coefficient, formula)?;
        }
        write!(f, " {} ", RENDER_ARROW)?;
        for (i, (coefficient, formula)) in self.product_terms.iter().enumerate() {
            if i != 0 {
                write!(f, " + ")?;
            }
            write!(f, "{} {}", coefficient, formula)?;
        }
        Ok(())
    }
}

/// Balance an equation string in one call.
///
/// Equivalent to [`Equation::parse`] followed by [`Equation::balance`].
///
/// # Example
/// ```
/// use chembal::balance;
///
/// let balanced = balance("Fe2(SO4)3 + KOH -> K2SO4 + Fe(OH)3").unwrap();
/// assert_eq!(balanced.to_string(), "1 Fe2(SO4)3 + 6 KOH → 3 K2SO4 + 2 Fe(OH)3");
/// ```
pub fn balance(equation: &str) -> Result<BalancedEquation, BalanceError> {
    Equation::parse(equation)?.balance()
}





/// Null space basis of a matrix over the rationals.
///
/// Reduces the matrix to reduced row echelon form with exact arithmetic
/// (partial pivoting on the largest absolute value), then back-substitutes one
/// basis vector per free column. An empty result means the matrix has full
/// column rank.
fn null_space(mut matrix: Vec<Vec<Rational>>, columns: usize) -> Vec<Vec<Rational>> {
    let rows = matrix.len();

    let mut pivot_columns = Vec::new();
    let mut row = 0;
    for col in 0..columns {
        if row == rows {
            break;
        }

        let mut i_max = row;
        for i in (row + 1)..rows {
            if (&matrix[i][col]).abs() > (&matrix[i_max][col]).abs() {
                i_max = i;
            }
        }
        if matrix[i_max][col] == Rational::ZERO {
            continue;
        }
        matrix.swap(row, i_max);

        // normalize the pivot row, then clear the pivot column everywhere else
        let pivot = matrix[row][col].clone();
        for j in col..columns {
            let value = &matrix[row][j] / &pivot;
            matrix[row][j] = value;
        }
        for i in 0..rows {
            if i == row || matrix[i][col] == Rational::ZERO {
                continue;
            }
            let factor = matrix[i][col].clone();
            for j in col..columns {
                let delta = &factor * &matrix[row][j];
                matrix[i][j] -= delta;
            }
        }

        pivot_columns.push(col);
        row += 1;
    }

    let free_columns: Vec<usize> = (0..columns).filter(|col| !pivot_columns.contains(col)).collect();
    free_columns
        .iter()
        .map(|&free| {
            let mut vector = vec![Rational::ZERO; columns];
            vector[free] = Rational::ONE;
            for (r, &pivot_col) in pivot_columns.iter().enumerate() {
                vector[pivot_col] = -&matrix[r][free];
            }
            vector
        })
        .collect()
}





/// Tally one whole side of an equation, honoring leading integer multipliers.
///
/// The side is scanned for `(multiplier?)(compound)` pairs; whitespace and `+`
/// between terms are absorbed by the scan rather than split on. The multiplier
/// (default 1, whitespace allowed before the compound) multiplies every atom
/// count of the compound, and all terms are summed into one tally. A digit
/// run with no compound after it is ignored.
///
/// # Arguments
/// * `expression` - one side of an equation, e.g. `"2 H2 + 1 O2"`
/// # Returns
/// * `Ok` - aggregate atom count per element
/// * `Err` - the first compound parse error
/// # Example
/// ```
/// use chembal::count_side;
/// use mendeleev::Element;
/// use std::collections::HashMap;
///
/// let tally = count_side("2 H2 + 1 O2").unwrap();
/// assert_eq!(tally, HashMap::from([(Element::H, 4), (Element::O, 2)]));
/// ```
pub fn count_side(expression: &str) -> Result<ElementTally, BalanceError> {
    fn is_compound_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '(' | ')' | '[' | ']')
    }

    let letters: Vec<char> = expression.chars().collect();
    let mut tally = ElementTally::new();

    let mut i = 0;
    while i < letters.len() {
        if letters[i].is_ascii_digit() {
            let start = i;
            while i < letters.len() && letters[i].is_ascii_digit() {
                i += 1;
            }

            let mut j = i;
            while j < letters.len() && letters[j].is_whitespace() {
                j += 1;
            }
            if j < letters.len() && is_compound_char(letters[j]) && !letters[j].is_ascii_digit() {
                let digits: String = letters[start..i].iter().collect();
                let multiplier = digits
                    .parse::<i64>()
                    .map_err(|_| BalanceError::UnparseableFormula(digits.clone()))?;

                let token_start = j;
                while j < letters.len() && is_compound_char(letters[j]) {
                    j += 1;
                }
                let token: String = letters[token_start..j].iter().collect();
                let compound = Compound::parse(&token)?;
                for (element, count) in compound.elements.iter() {
                    let scaled = count
                        .checked_mul(multiplier)
                        .ok_or(BalanceError::CoefficientOverflow)?;
                    let entry = tally.entry(*element).or_insert(0);
                    *entry = entry.checked_add(scaled).ok_or(BalanceError::CoefficientOverflow)?;
                }
                i = j;
            }
        } else if is_compound_char(letters[i]) {
            let start = i;
            while i < letters.len() && is_compound_char(letters[i]) {
                i += 1;
            }
            let token: String = letters[start..i].iter().collect();
            let compound = Compound::parse(&token)?;
            for (element, count) in compound.elements.iter() {
                let entry = tally.entry(*element).or_insert(0);
                *entry = entry.checked_add(*count).ok_or(BalanceError::CoefficientOverflow)?;
            }
        } else {
            i += 1;
        }
    }

    Ok(tally)
}

/// Outcome of independently re-counting both sides of a balanced equation
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Verification {
    /// Whether both sides have identical element tallies
    pub is_balanced: bool,
    /// Atom counts on the reagent side
    pub reagent_tally: ElementTally,
    /// Atom counts on the product side
    pub product_tally: ElementTally,
}
impl Verification {
    fn unverified() -> Self {
        Self {
            is_balanced: false,
            reagent_tally: ElementTally::new(),
            product_tally: ElementTally::new(),
        }
    }
}

/// Re-derive and compare the element tallies of a rendered balanced equation.
///
/// The input is untrusted: counts are recomputed from scratch with
/// [`count_side`]. The equation must contain the canonical `→` arrow; if the
/// arrow is missing, or either side fails to parse, the verdict is `false`
/// with empty tallies. The verdict requires identical key sets and identical
/// values, there is no partial match.
///
/// # Example
/// ```
/// use chembal::verify;
/// use mendeleev::Element;
///
/// let verification = verify("2 H2 + 1 O2 → 2 H2O");
/// assert!(verification.is_balanced);
/// assert_eq!(verification.reagent_tally[&Element::H], 4);
/// assert_eq!(verification.product_tally[&Element::O], 2);
/// ```
pub fn verify(balanced: &str) -> Verification {
    let parts: Vec<&str> = balanced.split(RENDER_ARROW).collect();
    if parts.len() != 2 {
        return Verification::unverified();
    }

    let reagent_tally = match count_side(parts[0]) {
        Ok(tally) => tally,
        Err(_) => return Verification::unverified(),
    };
    let product_tally = match count_side(parts[1]) {
        Ok(tally) => tally,
        Err(_) => return Verification::unverified(),
    };

    Verification {
        is_balanced: reagent_tally == product_tally,
        reagent_tally,
        product_tally,
    }
}





#[cfg(test)]
mod tests {
    use super::*;

    fn check(equation: &str, expected: &str) {
        let balanced = balance(equation).unwrap();
        assert_eq!(balanced.to_string(), expected);

        let verification = verify(&balanced.to_string());
        assert!(verification.is_balanced, "verifier rejected {}", balanced);
    }

    fn gcd(mut a: i64, mut b: i64) -> i64 {
        while b != 0 {
            (a, b) = (b, a % b);
        }
        a
    }


    #[test]
    fn separators() {
        for separator in SEPARATORS {
            let equation = format!("H2 + O2 {} H2O", separator);
            assert_eq!(balance(&equation).unwrap().to_string(), "2 H2 + 1 O2 → 2 H2O");
        }
    }

    #[test]
    fn eq1() {
        check("H2 + O2 -> H2O", "2 H2 + 1 O2 → 2 H2O");
    }

    #[test]
    fn eq2() {
        check("P4O10 + H2O -> H3PO4", "1 P4O10 + 6 H2O → 4 H3PO4");
    }

    #[test]
    fn eq3() {
        check("CO2 + H2O -> C6H12O6 + O2", "6 CO2 + 6 H2O → 1 C6H12O6 + 6 O2");
    }

    #[test]
    fn eq4() {
        check("SiCl4 + H2O -> H4SiO4 + HCl", "1 SiCl4 + 4 H2O → 1 H4SiO4 + 4 HCl");
    }

    #[test]
    fn eq5() {
        check("Al + HCl -> AlCl3 + H2", "2 Al + 6 HCl → 2 AlCl3 + 3 H2");
    }

    #[test]
    fn eq6() {
        check("Na2CO3 + HCl -> NaCl + H2O + CO2", "1 Na2CO3 + 2 HCl → 2 NaCl + 1 H2O + 1 CO2");
    }

    #[test]
    fn eq7() {
        check("C7H6O2 + O2 -> CO2 + H2O", "2 C7H6O2 + 15 O2 → 14 CO2 + 6 H2O");
    }

    #[test]
    fn eq8() {
        check("Fe2(SO4)3 + KOH -> K2SO4 + Fe(OH)3", "1 Fe2(SO4)3 + 6 KOH → 3 K2SO4 + 2 Fe(OH)3");
    }

    #[test]
    fn eq9() {
        check("Ca3(PO4)2 + SiO2 -> P4O10 + CaSiO3", "2 Ca3(PO4)2 + 6 SiO2 → 1 P4O10 + 6 CaSiO3");
    }

    #[test]
    fn eq10() {
        check("KClO3 -> KClO4 + KCl", "4 KClO3 → 3 KClO4 + 1 KCl");
    }

    #[test]
    fn eq11() {
        check("Al2(SO4)3 + Ca(OH)2 -> Al(OH)3 + CaSO4", "1 Al2(SO4)3 + 3 Ca(OH)2 → 2 Al(OH)3 + 3 CaSO4");
    }

    #[test]
    fn eq12() {
        check("H2SO4 + HI -> H2S + I2 + H2O", "1 H2SO4 + 8 HI → 1 H2S + 4 I2 + 4 H2O");
    }

    #[test]
    fn eq13() {
        check("C2H6 + O2 -> CO2 + H2O", "2 C2H6 + 7 O2 → 4 CO2 + 6 H2O");
    }

    #[test]
    fn eq14() {
        check("NaN3 -> Na + N2", "2 NaN3 → 2 Na + 3 N2");
    }

    #[test]
    fn eq15() {
        check("Na + Fe2O3 -> Na2O + Fe", "6 Na + 1 Fe2O3 → 3 Na2O + 2 Fe");
    }

    #[test]
    fn eq16() {
        check("Mg + N2 -> Mg3N2", "3 Mg + 1 N2 → 1 Mg3N2");
    }

    #[test]
    fn eq17() {
        check("Na + NH3 -> NaNH2 + H2", "2 Na + 2 NH3 → 2 NaNH2 + 1 H2");
    }

    #[test]
    fn eq18() {
        check("Na2O + CO2 + H2O -> NaHCO3", "1 Na2O + 2 CO2 + 1 H2O → 2 NaHCO3");
    }

    #[test]
    fn eq19() {
        check("P4S3 + O2 -> P4O6 + SO2", "1 P4S3 + 6 O2 → 1 P4O6 + 3 SO2");
    }

    #[test]
    fn eq20() {
        check("Na3PO4 + CaCl2 -> Ca3(PO4)2 + NaCl", "2 Na3PO4 + 3 CaCl2 → 1 Ca3(PO4)2 + 6 NaCl");
    }

    #[test]
    fn eq21() {
        check("C8H18 + O2 -> CO2 + H2O", "2 C8H18 + 25 O2 → 16 CO2 + 18 H2O");
    }

    #[test]
    fn eq22() {
        check("Pb(NO3)2 + KI -> PbI2 + KNO3", "1 Pb(NO3)2 + 2 KI → 1 PbI2 + 2 KNO3");
    }

    #[test]
    fn eq23() {
        check("N2O5 -> NO2 + O2", "2 N2O5 → 4 NO2 + 1 O2");
    }

    #[test]
    fn eq24() {
        check("KClO3 -> KCl + O2", "2 KClO3 → 2 KCl + 3 O2");
    }

    #[test]
    fn eq25() {
        check("CO + O2 -> CO2", "2 CO + 1 O2 → 2 CO2");
    }

    #[test]
    fn eq26() {
        check("C57H110O6 + O2 -> CO2 + H2O", "2 C57H110O6 + 163 O2 → 114 CO2 + 110 H2O");
    }

    #[test]
    fn eq27() {
        check("Cu + HNO3 -> Cu(NO3)2 + NO + H2O", "3 Cu + 8 HNO3 → 3 Cu(NO3)2 + 2 NO + 4 H2O");
    }

    #[test]
    fn eq28() {
        check("MoS2 + O2 -> MoO3 + SO2", "2 MoS2 + 7 O2 → 2 MoO3 + 4 SO2");
    }

    #[test]
    fn eq29() {
        check("XeF6 + H2O -> XeO3 + HF", "1 XeF6 + 3 H2O → 1 XeO3 + 6 HF");
    }

    #[test]
    fn eq30() {
        check("Al + Ag2SO4 -> Al2(SO4)3 + Ag", "2 Al + 3 Ag2SO4 → 1 Al2(SO4)3 + 6 Ag");
    }


    #[test]
    fn compound_repeated_elements_sum() {
        let compound = Compound::parse("C2H5OH").unwrap();
        let expected = HashMap::from([(Element::C, 2), (Element::H, 6), (Element::O, 1)]);
        assert_eq!(compound.elements(), &expected);
    }

    #[test]
    fn compound_nested_groups() {
        let compound = Compound::parse("K4[Fe(SCN)6]").unwrap();
        let expected = HashMap::from([
            (Element::K, 4),
            (Element::Fe, 1),
            (Element::S, 6),
            (Element::C, 6),
            (Element::N, 6),
        ]);
        assert_eq!(compound.elements(), &expected);
    }

    #[test]
    fn compound_multi_digit_counts() {
        let compound = Compound::parse("C57H110O6").unwrap();
        let expected = HashMap::from([(Element::C, 57), (Element::H, 110), (Element::O, 6)]);
        assert_eq!(compound.elements(), &expected);
    }

    #[test]
    fn compound_unknown_element() {
        assert_eq!(Compound::parse("Xq"), Err(BalanceError::UnknownElement("Xq".to_string())));
        assert_eq!(
            Compound::parse("H2Xq3"),
            Err(BalanceError::UnknownElement("Xq".to_string()))
        );
    }

    #[test]
    fn compound_unparseable() {
        assert!(matches!(Compound::parse(""), Err(BalanceError::UnparseableFormula(_))));
        assert!(matches!(Compound::parse("123"), Err(BalanceError::UnparseableFormula(_))));
        assert!(matches!(Compound::parse("(H2O"), Err(BalanceError::UnparseableFormula(_))));
        assert!(matches!(Compound::parse("H2O)"), Err(BalanceError::UnparseableFormula(_))));
        assert!(matches!(Compound::parse("()3"), Err(BalanceError::UnparseableFormula(_))));
        assert!(matches!(Compound::parse("h2o"), Err(BalanceError::UnparseableFormula(_))));
        assert!(matches!(Compound::parse("H0"), Err(BalanceError::UnparseableFormula(_))));
    }

    #[test]
    fn compound_count_overflow() {
        // group multiplication overflows i64
        assert_eq!(
            Compound::parse("(H4611686018427387904)4"),
            Err(BalanceError::CoefficientOverflow)
        );
        // summing repeated occurrences overflows i64
        assert_eq!(
            Compound::parse("H9223372036854775807H2"),
            Err(BalanceError::CoefficientOverflow)
        );
    }


    #[test]
    fn malformed_equations() {
        assert_eq!(balance("H2 O2 H2O"), Err(BalanceError::MalformedEquation));
        assert_eq!(balance("H2 -> O2 -> H2O"), Err(BalanceError::MalformedEquation));
    }

    #[test]
    fn mismatched_element_sets() {
        assert_eq!(balance("Na -> Cl"), Err(BalanceError::NoSolution));
    }

    #[test]
    fn forced_zero_coefficient() {
        // the only solution gives the lone oxygen atom a zero coefficient
        assert_eq!(balance("H2O2 + O -> H2O2"), Err(BalanceError::NoSolution));
    }

    #[test]
    fn forced_mixed_signs() {
        // balancing would require moving Br to the product side
        assert_eq!(balance("CaBr2 + Br -> Ca"), Err(BalanceError::NoSolution));
    }

    #[test]
    fn underdetermined_system() {
        // two independent reactions share one equation
        assert_eq!(balance("C + O2 -> CO + CO2"), Err(BalanceError::UnderdeterminedSystem));
    }

    #[test]
    fn empty_compound_term() {
        assert!(matches!(balance("Na + -> NaCl"), Err(BalanceError::UnparseableFormula(_))));
    }


    #[test]
    fn count_side_multipliers() {
        let tally = count_side("2 H2 + 1 O2").unwrap();
        assert_eq!(tally, HashMap::from([(Element::H, 4), (Element::O, 2)]));

        // multiplier attached directly to the compound
        let tally = count_side("2H2O + NaCl").unwrap();
        assert_eq!(
            tally,
            HashMap::from([(Element::H, 4), (Element::O, 2), (Element::Na, 1), (Element::Cl, 1)])
        );
    }

    #[test]
    fn count_side_multiplier_overflow() {
        assert_eq!(
            count_side("4611686018427387904 H4"),
            Err(BalanceError::CoefficientOverflow)
        );
    }

    #[test]
    fn count_side_stray_digits_ignored() {
        let tally = count_side("2 + H2").unwrap();
        assert_eq!(tally, HashMap::from([(Element::H, 2)]));
    }

    #[test]
    fn count_side_agrees_with_compound_parse() {
        // the verifier's scanning path and the balancer's per-compound path
        // must produce identical counts
        for formula in ["H2O", "Fe2(SO4)3", "K4[Fe(SCN)6]", "C57H110O6"] {
            let compound = Compound::parse(formula).unwrap();
            let tally = count_side(formula).unwrap();
            assert_eq!(&tally, compound.elements(), "paths disagree on {}", formula);
        }
    }


    #[test]
    fn verify_balanced_tallies() {
        let verification = verify("2 H2 + 1 O2 → 2 H2O");
        assert!(verification.is_balanced);

        let expected = HashMap::from([(Element::H, 4), (Element::O, 2)]);
        assert_eq!(verification.reagent_tally, expected);
        assert_eq!(verification.product_tally, expected);
    }

    #[test]
    fn verify_unbalanced_tallies() {
        let verification = verify("1 H2 + 1 O2 → 1 H2O");
        assert!(!verification.is_balanced);
        assert_eq!(verification.reagent_tally, HashMap::from([(Element::H, 2), (Element::O, 2)]));
        assert_eq!(verification.product_tally, HashMap::from([(Element::H, 2), (Element::O, 1)]));
    }

    #[test]
    fn verify_requires_canonical_arrow() {
        let verification = verify("2 H2 + 1 O2 = 2 H2O");
        assert!(!verification.is_balanced);
        assert!(verification.reagent_tally.is_empty());
        assert!(verification.product_tally.is_empty());
    }

    #[test]
    fn verify_rejects_garbage() {
        let verification = verify("2 Xq → 2 Xq");
        assert!(!verification.is_balanced);
        assert!(verification.reagent_tally.is_empty());
    }


    #[test]
    fn coefficients_are_minimal() {
        for equation in [
            "H2 + O2 -> H2O",
            "C8H18 + O2 -> CO2 + H2O",
            "Fe2(SO4)3 + KOH -> K2SO4 + Fe(OH)3",
            "Na2O + CO2 + H2O -> NaHCO3",
        ] {
            let coefficients = balance(equation).unwrap().coefficients();
            let divisor = coefficients.iter().copied().fold(0, gcd);
            assert_eq!(divisor, 1, "coefficients of {} share a factor", equation);
        }
    }

    #[test]
    fn balancing_is_deterministic() {
        let first = balance("Cu + HNO3 -> Cu(NO3)2 + NO + H2O").unwrap();
        let second = balance("Cu + HNO3 -> Cu(NO3)2 + NO + H2O").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rebalancing_is_idempotent() {
        for equation in ["H2 + O2 -> H2O", "Al + Ag2SO4 -> Al2(SO4)3 + Ag"] {
            let first = balance(equation).unwrap();

            // strip the coefficients from the rendering and balance again
            let join = |terms: &Vec<(i64, String)>| {
                terms.iter().map(|(_, formula)| formula.clone()).collect::<Vec<_>>().join(" + ")
            };
            let stripped = format!("{} -> {}", join(first.reagent_terms()), join(first.product_terms()));
            let second = balance(&stripped).unwrap();

            assert_eq!(first.coefficients(), second.coefficients());
        }
    }

    #[test]
    fn batch_is_order_insensitive() {
        let equations = [
            "H2 + O2 -> H2O",
            "Na -> Cl",
            "KClO3 -> KCl + O2",
            "C + O2 -> CO + CO2",
            "Mg + N2 -> Mg3N2",
        ];

        let forward: Vec<_> = equations.iter().map(|equation| balance(equation)).collect();
        let backward: Vec<_> = equations.iter().rev().map(|equation| balance(equation)).collect();

        for (result, reversed) in zip(forward.iter(), backward.iter().rev()) {
            assert_eq!(result, reversed);
        }
    }
}
