#[derive(Debug)]
pub enum MapOperation {
    Insert(u8, u8),
    InsertFirst(u8, u8),
    InsertLast(u8, u8),
    InsertIfAbsent(u8, u8),
    Get(u8),
    Peek(u8),
    Remove(u8),
    RemoveIfEq(u8, u8),
    Compute(u8, u8),
    Merge(u8, u8),
    PopFirst,
    PopLast,
    Clear,
    Retain(u8),
    ShrinkToFit,
    CursorRemove(u8),
}

impl<'a> arbitrary::Arbitrary<'a> for MapOperation {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        match u.int_in_range(0..=15)? {
            0 => Ok(MapOperation::Insert(u.arbitrary()?, u.arbitrary()?)),
            1 => Ok(MapOperation::InsertFirst(u.arbitrary()?, u.arbitrary()?)),
            2 => Ok(MapOperation::InsertLast(u.arbitrary()?, u.arbitrary()?)),
            3 => Ok(MapOperation::InsertIfAbsent(u.arbitrary()?, u.arbitrary()?)),
            4 => Ok(MapOperation::Get(u.arbitrary()?)),
            5 => Ok(MapOperation::Peek(u.arbitrary()?)),
            6 => Ok(MapOperation::Remove(u.arbitrary()?)),
            7 => Ok(MapOperation::RemoveIfEq(u.arbitrary()?, u.arbitrary()?)),
            8 => Ok(MapOperation::Compute(u.arbitrary()?, u.arbitrary()?)),
            9 => Ok(MapOperation::Merge(u.arbitrary()?, u.arbitrary()?)),
            10 => Ok(MapOperation::PopFirst),
            11 => Ok(MapOperation::PopLast),
            12 => Ok(MapOperation::Clear),
            13 => Ok(MapOperation::Retain(u.arbitrary()?)),
            14 => Ok(MapOperation::ShrinkToFit),
            15 => Ok(MapOperation::CursorRemove(u.arbitrary()?)),
            _ => unreachable!(),
        }
    }
}
