//! Newton over relaxation on small networks.

use std::cell::Cell;
use std::rc::Rc;

use gt_core::NodeId;
use gt_graph::{Assembler, Constant, CycleBreaker, Formula, Network, PortState, RelaxConfig, Sink};
use gt_solver::{
    NetworkCall, NewtonConfig, NewtonSolver, SolverError, Variator, VariatorSolver, system_call,
};

struct Balance {
    net: Network,
    residuals: NodeId,
    pa: Rc<Cell<f64>>,
    pb: Rc<Cell<f64>>,
}

/// A fixed 4/2 split feeds two branches scaled by `pa` and `pb`.
///
/// The balance node nulls `a + b` and `a - b - 2`, which holds only at
/// pa = 0.25, pb = -0.5.
fn balance(pa0: f64, pb0: f64) -> Balance {
    let pa = Rc::new(Cell::new(pa0));
    let pb = Rc::new(Cell::new(pb0));
    let mut net = Network::new();

    let split = net
        .add_node(Formula::new("split", &[], &["a", "b"], |_| {
            Ok(vec![PortState::Scalar(4.0), PortState::Scalar(2.0)])
        }))
        .unwrap();
    let scale_a = Rc::clone(&pa);
    let branch_a = net
        .add_node(Formula::scalar("branch_a", move |x| scale_a.get() * x))
        .unwrap();
    let scale_b = Rc::clone(&pb);
    let branch_b = net
        .add_node(Formula::scalar("branch_b", move |x| scale_b.get() * x))
        .unwrap();
    let bal = net
        .add_node(Formula::new("balance", &["a", "b"], &["mass", "power"], |i| {
            let (a, b) = (i[0].as_scalar()?, i[1].as_scalar()?);
            Ok(vec![PortState::Scalar(a + b), PortState::Scalar(a - b - 2.0)])
        }))
        .unwrap();
    let residuals = net
        .add_node(Assembler::new("residuals", &["mass", "power"], "out"))
        .unwrap();
    let end = net.add_node(Sink::new("end")).unwrap();

    net.link((split, "a"), (branch_a, "in")).unwrap();
    net.link((split, "b"), (branch_b, "in")).unwrap();
    net.link((branch_a, "out"), (bal, "a")).unwrap();
    net.link((branch_b, "out"), (bal, "b")).unwrap();
    net.link((bal, "mass"), (residuals, "mass")).unwrap();
    net.link((bal, "power"), (residuals, "power")).unwrap();
    net.link((residuals, "out"), (end, "in")).unwrap();

    Balance {
        net,
        residuals,
        pa,
        pb,
    }
}

fn variators(pa: &Rc<Cell<f64>>, pb: &Rc<Cell<f64>>) -> Vec<Variator> {
    vec![
        Variator::from_cell("pa", Rc::clone(pa)),
        Variator::from_cell("pb", Rc::clone(pb)),
    ]
}

#[test]
fn two_branch_balance_finds_closed_form_point() {
    let Balance {
        net,
        residuals,
        pa,
        pb,
    } = balance(0.3, -0.4);
    let call = NetworkCall::new(net, residuals, "out", RelaxConfig::default()).unwrap();
    let mut solver = VariatorSolver::new(
        variators(&pa, &pb),
        call,
        NewtonSolver::new(vec![1e-6, 1e-6]).unwrap(),
    );

    let report = solver.solve(1e-9, 20).unwrap();
    assert!((pa.get() - 0.25).abs() < 1e-6);
    assert!((pb.get() + 0.5).abs() < 1e-6);
    assert!(report.residual_norm <= 1e-9);

    let net = solver.into_call().into_network();
    let r = net.vector(residuals, "out").unwrap();
    assert!(r.iter().all(|v| v.abs() <= 1e-9));
}

#[test]
fn borrowed_bridge_leaves_network_usable() {
    let Balance {
        mut net,
        residuals,
        pa,
        pb,
    } = balance(0.0, 0.0);
    {
        let call = system_call(&mut net, residuals, "out", RelaxConfig::default());
        let mut solver =
            VariatorSolver::with_config(variators(&pa, &pb), call, &NewtonConfig::default())
                .unwrap();
        solver.solve_with(&NewtonConfig::default()).unwrap();
    }
    assert!((pa.get() - 0.25).abs() < 1e-6);
    let report = net.solve(&RelaxConfig::default()).unwrap();
    assert_eq!(report.iterations, 1);
}

/// Relaxed loop x = 0.5 * s * p + 0.25 * x closed by a breaker, s = 3.
///
/// The loop settles at x = 2p, so nulling `x - 2` needs p = 1.
fn looped(p0: f64) -> (Network, NodeId, Rc<Cell<f64>>) {
    let p = Rc::new(Cell::new(p0));
    let gain = Rc::clone(&p);
    let mut net = Network::new();
    let s = net.add_node(Constant::new("s", PortState::Scalar(3.0))).unwrap();
    let x = net
        .add_node(Formula::new("x", &["a", "b"], &["out"], move |i| {
            let v = 0.5 * i[0].as_scalar()? * gain.get() + 0.25 * i[1].as_scalar()?;
            Ok(vec![PortState::Scalar(v)])
        }))
        .unwrap();
    let y = net
        .add_node(Formula::new("y", &["in"], &["back", "err"], |i| {
            let v = i[0].as_scalar()?;
            Ok(vec![PortState::Scalar(v), PortState::Scalar(v - 2.0)])
        }))
        .unwrap();
    let cb = net.add_node(CycleBreaker::new("cb")).unwrap();
    let res = net.add_node(Assembler::new("res", &["err"], "out")).unwrap();
    let end = net.add_node(Sink::new("end")).unwrap();

    net.link((s, "out"), (x, "a")).unwrap();
    net.link((x, "out"), (y, "in")).unwrap();
    net.link((y, "back"), (cb, "a")).unwrap();
    net.link((cb, "b"), (x, "b")).unwrap();
    net.link((y, "err"), (res, "err")).unwrap();
    net.link((res, "out"), (end, "in")).unwrap();
    net.set_state(cb, "a", PortState::Scalar(0.0)).unwrap();
    net.set_state(cb, "b", PortState::Scalar(0.0)).unwrap();
    (net, res, p)
}

#[test]
fn newton_drives_an_inner_relaxation_loop() {
    let (net, res, p) = looped(0.5);
    let call = NetworkCall::new(net, res, "out", RelaxConfig::new(1.0, 500, 1e-13)).unwrap();
    let mut solver = VariatorSolver::new(
        vec![Variator::from_cell("p", Rc::clone(&p))],
        call,
        NewtonSolver::new(vec![1e-5]).unwrap(),
    );
    solver.solve(1e-8, 30).unwrap();
    assert!((p.get() - 1.0).abs() < 1e-6);
}

#[test]
fn unconverged_inner_solve_fails_the_outer_one() {
    let (net, res, p) = looped(0.5);
    let call = NetworkCall::new(net, res, "out", RelaxConfig::new(1.0, 2, 0.0)).unwrap();
    let mut solver = VariatorSolver::new(
        vec![Variator::from_cell("p", p)],
        call,
        NewtonSolver::new(vec![1e-5]).unwrap(),
    );
    assert!(matches!(
        solver.solve(1e-8, 30),
        Err(SolverError::RelaxationNotConverged { iterations: 2, .. })
    ));
}
