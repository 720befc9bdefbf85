mod common;

use std::sync::Arc;

use degstore::{
    identifier::{contrast_ids, sample_ids, StudyId},
    node::Node,
    storage::{erase_node, store::FilesystemStore},
    study::{BenjaminiHochberg, Contrast, ExpressionMatrix, GeneUniverse, Study, StudyAssembler},
};

#[test]
fn hierarchy_tree() -> Result<(), Box<dyn std::error::Error>> {
    common::init_tracing();
    let path = tempfile::TempDir::new()?;
    let store = Arc::new(FilesystemStore::new(path.path())?);
    let genes = Arc::new(GeneUniverse::from_reader("id\ng1\ng2\n".as_bytes(), '\t')?);
    let assembler = StudyAssembler::create_root(store.clone(), "/", genes.clone())?;

    let study_id = StudyId::new("gsfa1")?;
    let contrast = Contrast::from_pvalues(
        contrast_ids(&study_id, 1).remove(0),
        "~ A",
        genes.genes(),
        &[0.1, 0.4],
        &[1.0, -1.0],
        &BenjaminiHochberg,
    )?;
    let expression = ExpressionMatrix::new(genes.genes().to_vec(), sample_ids(1), vec![7.0, 8.0])?;
    assembler.assemble(&Study::new(study_id, vec![contrast], expression))?;

    let node = Node::open(&*store, "/")?;
    let tree = node.hierarchy_tree();
    println!("{tree}");
    assert_eq!(
        tree,
        "/
  gsfa1
    contrasts sparse [contrast] formula:string_utf8
    stats sparse [gene, contrast] pvalue:float64 fdr:float64 logFC:float64
    tpm sparse [gene, sample] expr:float64
    tpm_dense dense [gene, sample] expr:float64
"
    );

    erase_node(&*store, node.children()[0].path())?;
    assert_eq!(Node::open(&*store, "/")?.hierarchy_tree(), "/\n");
    Ok(())
}
