use cvdn_navigation::{NavGraph, ScanGraph};
use nalgebra::Vector3;

fn main() {
    // A small floor: a corridor A-B-C-D with a shortcut room E between A and D.
    //
    //   A ---- B ---- C
    //   |             |
    //   E ----------- D
    let nodes = [
        ("A", Vector3::new(0.0, 4.0, 0.0)),
        ("B", Vector3::new(3.0, 4.0, 0.0)),
        ("C", Vector3::new(6.0, 4.0, 0.0)),
        ("D", Vector3::new(6.0, 0.0, 0.0)),
        ("E", Vector3::new(0.0, 0.0, 0.0)),
    ];
    let edges = [("A", "B"), ("B", "C"), ("C", "D"), ("A", "E"), ("E", "D")];

    let mut scan = ScanGraph::new("demo");
    for (id, position) in nodes {
        scan.add_node(id, position);
    }
    for (a, b) in edges {
        if let Err(e) = scan.add_edge(a, b) {
            eprintln!("Failed to add edge {a}-{b}: {e}");
            return;
        }
    }
    println!("{}", scan);

    let nav = NavGraph::from_graphs([scan]);
    for (start, goal) in [("A", "C"), ("A", "D"), ("B", "E")] {
        match (
            nav.shortest_path("demo", start, goal),
            nav.shortest_distance("demo", start, goal),
        ) {
            (Ok(path), Ok(distance)) => {
                println!("{start} -> {goal}: {} ({distance:.2} m)", path.join(" -> "));
            }
            (Err(e), _) | (_, Err(e)) => println!("{start} -> {goal}: {e}"),
        }
    }
}
