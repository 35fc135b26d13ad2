//! Some utility functions

use crate::lifecycle::PipelineReport;
use crate::memory::{MemoryTree, Node};
use crate::resource::DavPath;

/// A debug utility that pretty-prints the outcome of a scheduling hook
pub fn print_report(report: &PipelineReport) {
    println!("{:?} ({})", report.change, if report.modified { "content rewritten" } else { "content unchanged" });
    for delivery in &report.deliveries {
        let status = delivery.outcome.status();
        println!("    {} {}\t{}\t{}", status, delivery.kind, delivery.address, delivery.outcome);
    }
}

/// A debug utility that pretty-prints a tree, starting at `path`
pub fn print_tree(tree: &MemoryTree, path: &DavPath) {
    print_node(tree, path, 0);
}

fn print_node(tree: &MemoryTree, path: &DavPath, depth: usize) {
    let indent = "    ".repeat(depth);
    match tree.node(path) {
        None => println!("{}{} (missing)", indent, path),
        Some(Node::Object(content)) => println!("{}{}\t{} bytes", indent, path.name(), content.len()),
        Some(Node::Collection(resource_type)) => {
            println!("{}{}/\t{:?}", indent, path.name(), resource_type);
            for child in tree.children(path.clone()) {
                print_node(tree, &child, depth + 1);
            }
        },
    }
}
