use crate::domain::EvaluationDomain;
use crate::error::Groth16Error;
use crate::parser::{self, BinaryOp, Expr};
use crate::polynomial::Polynomial;
use ark_ff::Field;
use itertools::izip;
use log::{debug, trace};
use rootcause::prelude::ResultExt;
use rootcause::{Report, report};
use serde::Deserialize;
use std::collections::HashMap;

/// Wire 0 always carries the constant one.
pub const ONE_WIRE: usize = 0;
/// Only the constant wire is public; every other wire is private to the prover.
pub const NUM_PUBLIC_WIRES: usize = 1;

const ONE_WIRE_NAME: &str = "~one";
const OUTPUT_WIRE_NAME: &str = "~out";

/// Knobs for the circuit compiler.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerOptions {
    /// Largest literal exponent `x ** e` accepted; each power costs `e - 1` gates.
    pub max_exponent: u32,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions { max_exponent: 64 }
    }
}

impl CompilerOptions {
    pub fn from_json(json: &str) -> Result<Self, Report<Groth16Error>> {
        serde_json::from_str(json).map_err(|e| {
            report!(Groth16Error::Serialization(format!(
                "invalid compiler options: {e}"
            )))
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand<F: Field> {
    Wire(usize),
    /// A constant, carried as a coefficient on the one wire.
    Constant(F),
}

impl<F: Field> Operand<F> {
    fn value(&self, wires: &[F]) -> F {
        match self {
            Operand::Wire(index) => wires[*index],
            Operand::Constant(value) => *value,
        }
    }

    /// Add `sign * self` to a constraint row.
    fn accumulate(&self, row: &mut [F], sign: F) {
        match self {
            Operand::Wire(index) => row[*index] += sign,
            Operand::Constant(value) => row[ONE_WIRE] += sign * value,
        }
    }
}

/// One elementary operation `output = left (op) right`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gate<F: Field> {
    pub output: usize,
    pub op: BinaryOp,
    pub left: Operand<F>,
    pub right: Operand<F>,
}

impl<F: Field> Gate<F> {
    fn evaluate(&self, wires: &[F]) -> F {
        let left = self.left.value(wires);
        let right = self.right.value(wires);
        match self.op {
            BinaryOp::Add => left + right,
            BinaryOp::Sub => left - right,
            BinaryOp::Mul => left * right,
        }
    }

    /// The rank-1 rows `(a, b, c)` with `<a, w> * <b, w> = <c, w>`.
    ///
    /// Additions and subtractions are linear, so they go entirely in `a` and multiply the one wire.
    fn constraint_rows(&self, num_wires: usize) -> (Vec<F>, Vec<F>, Vec<F>) {
        let mut a = vec![F::zero(); num_wires];
        let mut b = vec![F::zero(); num_wires];
        let mut c = vec![F::zero(); num_wires];
        match self.op {
            BinaryOp::Mul => {
                self.left.accumulate(&mut a, F::one());
                self.right.accumulate(&mut b, F::one());
            }
            BinaryOp::Add => {
                self.left.accumulate(&mut a, F::one());
                self.right.accumulate(&mut a, F::one());
                b[ONE_WIRE] = F::one();
            }
            BinaryOp::Sub => {
                self.left.accumulate(&mut a, F::one());
                self.right.accumulate(&mut a, -F::one());
                b[ONE_WIRE] = F::one();
            }
        }
        c[self.output] = F::one();
        (a, b, c)
    }
}

fn check_witness_length(
    witness_len: usize,
    num_wires: usize,
    context: &'static str,
) -> Result<(), Report<Groth16Error>> {
    if witness_len != num_wires {
        return Err(report!(Groth16Error::Dimension {
            context,
            expected: num_wires,
            actual: witness_len,
        }));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(non_snake_case)]
pub struct R1CS<F: Field> {
    /// Column-wise, i.e. a vec of columns
    L: Vec<Vec<F>>,
    /// Column-wise, i.e. a vec of columns
    R: Vec<Vec<F>>,
    /// Column-wise, i.e. a vec of columns
    O: Vec<Vec<F>>,
}

#[allow(non_snake_case)]
impl<F: Field> R1CS<F> {
    /// Build from column-wise matrices: one column per wire, one entry per gate.
    pub fn new(
        L: Vec<Vec<F>>,
        R: Vec<Vec<F>>,
        O: Vec<Vec<F>>,
    ) -> Result<Self, Report<Groth16Error>> {
        for (context, matrix) in [("R1CS right matrix", &R), ("R1CS output matrix", &O)] {
            if matrix.len() != L.len() {
                return Err(report!(Groth16Error::Dimension {
                    context,
                    expected: L.len(),
                    actual: matrix.len(),
                }));
            }
        }
        let num_gates = L.first().map_or(0, Vec::len);
        for (context, matrix) in [
            ("R1CS left column length", &L),
            ("R1CS right column length", &R),
            ("R1CS output column length", &O),
        ] {
            if let Some((wire, column)) = matrix
                .iter()
                .enumerate()
                .find(|(_, column)| column.len() != num_gates)
            {
                return Err(report!(Groth16Error::Dimension {
                    context,
                    expected: num_gates,
                    actual: column.len(),
                })
                .attach(format!("Wire: {wire}")));
            }
        }
        Ok(R1CS { L, R, O })
    }

    /// Build from integer matrices, as written out by hand in tests and examples.
    pub fn from_ints(
        L: Vec<Vec<u64>>,
        R: Vec<Vec<u64>>,
        O: Vec<Vec<u64>>,
    ) -> Result<Self, Report<Groth16Error>> {
        let convert = |matrix: Vec<Vec<u64>>| -> Vec<Vec<F>> {
            matrix
                .into_iter()
                .map(|column| column.into_iter().map(F::from).collect())
                .collect()
        };
        Self::new(convert(L), convert(R), convert(O))
    }

    fn from_gates(gates: &[Gate<F>], num_wires: usize) -> Self {
        let mut L = vec![vec![F::zero(); gates.len()]; num_wires];
        let mut R = L.clone();
        let mut O = L.clone();
        for (k, gate) in gates.iter().enumerate() {
            let (a, b, c) = gate.constraint_rows(num_wires);
            for wire in 0..num_wires {
                L[wire][k] = a[wire];
                R[wire][k] = b[wire];
                O[wire][k] = c[wire];
            }
        }
        R1CS { L, R, O }
    }

    pub fn num_wires(&self) -> usize {
        self.L.len()
    }

    pub fn num_gates(&self) -> usize {
        self.L.first().map_or(0, Vec::len)
    }

    /// Check every constraint row against `witness`.
    pub fn verify(&self, witness: &[F]) -> Result<bool, Report<Groth16Error>> {
        check_witness_length(witness.len(), self.num_wires(), "R1CS witness length")?;
        let dot = |matrix: &Vec<Vec<F>>, gate: usize| -> F {
            matrix
                .iter()
                .zip(witness)
                .map(|(column, w_i)| column[gate] * w_i)
                .sum()
        };
        Ok((0..self.num_gates())
            .all(|gate| dot(&self.L, gate) * dot(&self.R, gate) == dot(&self.O, gate)))
    }
}

/// Quadratic arithmetic program: one polynomial per wire for each side of every constraint,
/// interpolated over [`EvaluationDomain`] with one point per gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QAP<F>
where
    F: Field,
{
    /// LHS of multiplication
    a: Vec<Polynomial<F>>,
    /// RHS of multiplication
    b: Vec<Polynomial<F>>,
    /// Output
    c: Vec<Polynomial<F>>,
    num_gates: usize,
}

impl<F: Field> QAP<F> {
    pub fn new(
        a: Vec<Polynomial<F>>,
        b: Vec<Polynomial<F>>,
        c: Vec<Polynomial<F>>,
        num_gates: usize,
    ) -> Result<Self, Report<Groth16Error>> {
        for (context, sequence) in [("QAP b sequence", &b), ("QAP c sequence", &c)] {
            if sequence.len() != a.len() {
                return Err(report!(Groth16Error::Dimension {
                    context,
                    expected: a.len(),
                    actual: sequence.len(),
                }));
            }
        }
        if let Some((wire, len)) = izip!(&a, &b, &c)
            .enumerate()
            .flat_map(|(wire, (a_i, b_i, c_i))| {
                [a_i, b_i, c_i].map(|p| (wire, p.coefficients().len()))
            })
            .find(|(_, len)| *len > num_gates)
        {
            return Err(report!(Groth16Error::Dimension {
                context: "QAP polynomial coefficients vs gate count",
                expected: num_gates,
                actual: len,
            })
            .attach(format!("Wire: {wire}")));
        }
        Ok(QAP { a, b, c, num_gates })
    }

    pub fn a(&self) -> &[Polynomial<F>] {
        &self.a
    }

    pub fn b(&self) -> &[Polynomial<F>] {
        &self.b
    }

    pub fn c(&self) -> &[Polynomial<F>] {
        &self.c
    }

    pub fn num_wires(&self) -> usize {
        self.a.len()
    }

    pub fn num_gates(&self) -> usize {
        self.num_gates
    }

    pub fn domain(&self) -> EvaluationDomain<F> {
        EvaluationDomain::new(self.num_gates)
    }

    pub fn vanishing_polynomial(&self) -> Polynomial<F> {
        self.domain().vanishing_polynomial()
    }

    /// The witness-weighted sums `(Σwᵢaᵢ, Σwᵢbᵢ, Σwᵢcᵢ)`.
    pub fn combine(
        &self,
        witness: &[F],
    ) -> Result<(Polynomial<F>, Polynomial<F>, Polynomial<F>), Report<Groth16Error>> {
        check_witness_length(witness.len(), self.num_wires(), "QAP witness length")?;
        let weighted = |polynomials: &[Polynomial<F>]| -> Polynomial<F> {
            polynomials
                .iter()
                .zip(witness)
                .map(|(p, w_i)| p * *w_i)
                .sum()
        };
        Ok((
            weighted(&self.a[..]),
            weighted(&self.b[..]),
            weighted(&self.c[..]),
        ))
    }

    /// True when `A(x)B(x) - C(x)` vanishes on the whole domain, i.e. is divisible by `z`.
    pub fn verify(
        &self,
        witness: &[F],
        z: &Polynomial<F>,
    ) -> Result<bool, Report<Groth16Error>> {
        let (a, b, c) = self.combine(witness)?;
        let (_, remainder) = (&(&a * &b) - &c).div_rem(z)?;
        Ok(remainder.is_zero())
    }
}

impl<F: Field> TryFrom<&R1CS<F>> for QAP<F> {
    type Error = Report<Groth16Error>;

    fn try_from(r1cs: &R1CS<F>) -> Result<Self, Self::Error> {
        let domain = EvaluationDomain::new(r1cs.num_gates());
        let basis = domain.lagrange_basis()?;
        let interpolate = |columns: &[Vec<F>]| -> Result<Vec<Polynomial<F>>, Report<Groth16Error>> {
            columns
                .iter()
                .enumerate()
                .map(|(wire, column)| {
                    EvaluationDomain::interpolate_with_basis(&basis, column)
                        .attach(format!("Interpolating wire {wire}"))
                })
                .collect()
        };
        QAP::new(
            interpolate(&r1cs.L[..])?,
            interpolate(&r1cs.R[..])?,
            interpolate(&r1cs.O[..])?,
            r1cs.num_gates(),
        )
    }
}

/// Lowers a parsed function into gates, allocating wires in evaluation order.
struct Lowering<'a, F: Field> {
    options: &'a CompilerOptions,
    wire_names: Vec<String>,
    bindings: HashMap<String, usize>,
    gates: Vec<Gate<F>>,
    temporaries: usize,
}

impl<'a, F: Field> Lowering<'a, F> {
    fn new(inputs: &[String], options: &'a CompilerOptions) -> Self {
        let mut wire_names = vec![ONE_WIRE_NAME.to_string()];
        wire_names.extend(inputs.iter().cloned());
        let bindings = inputs
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i + 1))
            .collect();
        Lowering {
            options,
            wire_names,
            bindings,
            gates: Vec::new(),
            temporaries: 0,
        }
    }

    fn allocate(&mut self, name: String) -> usize {
        self.wire_names.push(name);
        self.wire_names.len() - 1
    }

    fn allocate_temporary(&mut self) -> usize {
        let name = format!("~tmp{}", self.temporaries);
        self.temporaries += 1;
        self.allocate(name)
    }

    fn emit(
        &mut self,
        op: BinaryOp,
        left: Operand<F>,
        right: Operand<F>,
        dest: Option<usize>,
    ) -> Operand<F> {
        let output = dest.unwrap_or_else(|| self.allocate_temporary());
        let gate = Gate {
            output,
            op,
            left,
            right,
        };
        trace!("Gate {}: {:?}", self.gates.len(), gate);
        self.gates.push(gate);
        Operand::Wire(output)
    }

    /// An already-computed value; copied into `dest` with a `value * 1` gate if one is requested.
    fn place(&mut self, operand: Operand<F>, dest: Option<usize>) -> Operand<F> {
        match dest {
            Some(_) => self.emit(BinaryOp::Mul, operand, Operand::Constant(F::one()), dest),
            None => operand,
        }
    }

    fn lower(
        &mut self,
        expr: &Expr,
        dest: Option<usize>,
        line: usize,
    ) -> Result<Operand<F>, Report<Groth16Error>> {
        match expr {
            Expr::Constant(value) => Ok(self.place(Operand::Constant(F::from(*value)), dest)),
            Expr::Variable(name) => {
                let wire = *self.bindings.get(name).ok_or_else(|| {
                    report!(Groth16Error::compilation(
                        line,
                        format!("undeclared identifier `{name}`")
                    ))
                })?;
                Ok(self.place(Operand::Wire(wire), dest))
            }
            Expr::Neg(inner) => match self.lower(inner, None, line)? {
                Operand::Constant(value) => Ok(self.place(Operand::Constant(-value), dest)),
                wire => Ok(self.emit(BinaryOp::Sub, Operand::Constant(F::zero()), wire, dest)),
            },
            Expr::Binary(op, lhs, rhs) => {
                let left = self.lower(lhs, None, line)?;
                let right = self.lower(rhs, None, line)?;
                Ok(self.emit(*op, left, right, dest))
            }
            Expr::Pow(base, exponent) => {
                if *exponent > self.options.max_exponent {
                    return Err(report!(Groth16Error::compilation(
                        line,
                        format!(
                            "exponent {exponent} exceeds the maximum of {}",
                            self.options.max_exponent
                        )
                    )));
                }
                let base = self.lower(base, None, line)?;
                match *exponent {
                    0 => Ok(self.place(Operand::Constant(F::one()), dest)),
                    1 => Ok(self.place(base, dest)),
                    _ => {
                        let mut acc = base;
                        for step in 1..*exponent {
                            let step_dest = if step + 1 == *exponent { dest } else { None };
                            acc = self.emit(BinaryOp::Mul, acc, base, step_dest);
                        }
                        Ok(acc)
                    }
                }
            }
        }
    }

    /// Bind `target` to a fresh wire holding `value`. The wire is reserved before the expression
    /// is lowered, so the target precedes its temporaries in the wire order.
    fn assign(
        &mut self,
        target: &str,
        wire_name: String,
        value: &Expr,
        line: usize,
    ) -> Result<usize, Report<Groth16Error>> {
        let wire = self.allocate(wire_name);
        self.lower(value, Some(wire), line)?;
        self.bindings.insert(target.to_string(), wire);
        Ok(wire)
    }
}

/// A compiled circuit: its wires, gates, constraint system and QAP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Circuit<F: Field> {
    name: String,
    num_inputs: usize,
    wire_names: Vec<String>,
    gates: Vec<Gate<F>>,
    output_wire: usize,
    r1cs: R1CS<F>,
    qap: QAP<F>,
}

impl<F: Field> Circuit<F> {
    pub fn compile(source: &str) -> Result<Self, Report<Groth16Error>> {
        Self::compile_with(source, &CompilerOptions::default())
    }

    pub fn compile_with(
        source: &str,
        options: &CompilerOptions,
    ) -> Result<Self, Report<Groth16Error>> {
        let function = parser::parse_function(source)?;
        debug!(
            "Parsed circuit `{}` with inputs {:?}",
            function.name, function.inputs
        );

        let mut lowering = Lowering::new(&function.inputs, options);
        for assignment in &function.body {
            lowering.assign(
                &assignment.target,
                assignment.target.clone(),
                &assignment.value,
                assignment.line,
            )?;
        }
        let output_wire = lowering.assign(
            OUTPUT_WIRE_NAME,
            OUTPUT_WIRE_NAME.to_string(),
            &function.output,
            function.return_line,
        )?;

        let Lowering {
            wire_names, gates, ..
        } = lowering;
        let r1cs = R1CS::from_gates(&gates, wire_names.len());
        let qap = QAP::try_from(&r1cs).attach(format!("Compiling circuit `{}`", function.name))?;

        debug!(
            "Compiled circuit `{}`: {} gates over {} wires",
            function.name,
            gates.len(),
            wire_names.len()
        );

        Ok(Circuit {
            name: function.name,
            num_inputs: function.inputs.len(),
            wire_names,
            gates,
            output_wire,
            r1cs,
            qap,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wire_names(&self) -> &[String] {
        &self.wire_names
    }

    pub fn gates(&self) -> &[Gate<F>] {
        &self.gates
    }

    pub fn output_wire(&self) -> usize {
        self.output_wire
    }

    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    pub fn wire_count(&self) -> usize {
        self.wire_names.len()
    }

    pub fn r1cs(&self) -> &R1CS<F> {
        &self.r1cs
    }

    pub fn qap(&self) -> &QAP<F> {
        &self.qap
    }

    pub fn into_qap(self) -> QAP<F> {
        self.qap
    }

    /// Evaluate the gates on concrete inputs (in declaration order), producing the full witness.
    pub fn witness(&self, inputs: &[F]) -> Result<Vec<F>, Report<Groth16Error>> {
        if inputs.len() != self.num_inputs {
            return Err(report!(Groth16Error::Dimension {
                context: "circuit inputs",
                expected: self.num_inputs,
                actual: inputs.len(),
            })
            .attach(format!("Inputs: {:?}", &self.wire_names[1..=self.num_inputs])));
        }

        let mut wires = vec![F::zero(); self.wire_count()];
        wires[ONE_WIRE] = F::one();
        wires[1..=self.num_inputs].copy_from_slice(inputs);
        for gate in &self.gates {
            wires[gate.output] = gate.evaluate(&wires);
        }
        Ok(wires)
    }
}

/// Compile a circuit function.
pub fn compile_circuit<F: Field>(source: &str) -> Result<Circuit<F>, Report<Groth16Error>> {
    Circuit::compile(source)
}

/// Compile a circuit function, returning `(qap, gate_count, wire_count)`.
pub fn compile<F: Field>(source: &str) -> Result<(QAP<F>, usize, usize), Report<Groth16Error>> {
    let circuit = Circuit::compile(source)?;
    let (gates, wires) = (circuit.gate_count(), circuit.wire_count());
    Ok((circuit.into_qap(), gates, wires))
}
